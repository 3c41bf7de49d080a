use tracing::{debug, info};

use rookery_core::{NestName, Outcome, Payload, kinds};
use rookery_node::{HandlerRegistry, Nest};

/// Register the `gossip` handler
pub fn register(registry: &HandlerRegistry) {
    registry.register_fn(kinds::GOSSIP, handle_gossip);
}

/// Handle a gossip message relayed by `source`
///
/// Answers `Empty` right away; the onward flood runs in the background.
pub fn handle_gossip(nest: &Nest, payload: Payload, source: &NestName) -> Outcome {
    let message = payload.into_text(kinds::GOSSIP)?;

    if !nest.with_state(|state| state.gossip.receive(&message, source)) {
        debug!(nest = %nest.name(), from = %source, "Gossip already seen");
        return Ok(Payload::Empty);
    }

    info!(nest = %nest.name(), from = %source, message = %message, "Received gossip");
    nest.flood(kinds::GOSSIP, Payload::Text(message), Some(source));
    Ok(Payload::Empty)
}

/// Start a gossip flood from `nest`
///
/// Always sends to every neighbor, so a message `nest` already saw can be
/// pushed again after a lost relay. Returns the number of neighbors sent to.
pub fn send_gossip(nest: &Nest, message: impl Into<String>) -> usize {
    let message = message.into();
    if nest.with_state(|state| state.gossip.mark_seen(&message)) {
        info!(nest = %nest.name(), message = %message, "Starting gossip");
    } else {
        debug!(nest = %nest.name(), message = %message, "Resending gossip");
    }
    nest.flood(kinds::GOSSIP, Payload::Text(message), None)
}
