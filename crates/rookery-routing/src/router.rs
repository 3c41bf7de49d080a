//! Hop-by-hop forwarding toward non-neighbors
//!
//! A request for a non-neighbor travels wrapped in a `route` request. Each
//! relaying nest picks the next hop from its own topology table, so the
//! payload is forwarded unchanged and the final outcome, success or
//! failure, comes back along the same chain of requests.
//!
//! Before topology converges two nests can disagree about the path. A hop
//! that would hand the request straight back to the nest it came from fails
//! with `Unreachable` instead of bouncing.

use async_trait::async_trait;
use tracing::{Instrument, debug, debug_span};

use rookery_core::{NestName, Outcome, Payload, RequestError, kinds};
use rookery_logging::spans;
use rookery_node::{HandlerRegistry, Nest, RequestHandler};

use crate::path::find_route;

pub(crate) fn register(registry: &HandlerRegistry) {
    registry.register(kinds::ROUTE, RouteHandler);
}

/// Deliver a request to any nest `nest` knows a path to
///
/// Neighbors are requested directly. Anything else goes through the first
/// hop [`find_route`] picks from `nest`'s topology table, or fails with
/// [`RequestError::Unreachable`] without sending anything. A request for
/// `nest` itself is handled locally with `nest` as the source.
pub async fn route_request(nest: &Nest, target: &NestName, kind: &str, payload: Payload) -> Outcome {
    forward(nest, target, kind, payload, None).await
}

async fn forward(
    nest: &Nest,
    target: &NestName,
    kind: &str,
    payload: Payload,
    from: Option<&NestName>,
) -> Outcome {
    if target == nest.name() {
        return nest.dispatch_local(kind, payload, nest.name()).await;
    }
    if nest.is_neighbor(target.as_str()) {
        return nest.request(target, kind, payload).await;
    }

    let via = nest.with_state(|state| find_route(nest.name(), target, &state.connections));
    let unreachable = || RequestError::Unreachable {
        from: nest.name().clone(),
        to: target.clone(),
    };
    let Some(via) = via else {
        debug!(nest = %nest.name(), to = %target, kind, "No route");
        return Err(unreachable());
    };
    if from == Some(&via) {
        debug!(nest = %nest.name(), to = %target, via = %via, kind, "Route leads back to sender");
        return Err(unreachable());
    }

    let span = debug_span!(spans::ROUTE, nest = %nest.name(), to = %target, via = %via, kind);
    let wrapped = Payload::Route {
        target: target.clone(),
        kind: kind.to_string(),
        payload: Box::new(payload),
    };
    async {
        debug!("Forwarding");
        nest.request(&via, kinds::ROUTE, wrapped).await
    }
    .instrument(span)
    .await
}

/// Handles `route` requests by forwarding them one hop further
pub struct RouteHandler;

#[async_trait]
impl RequestHandler for RouteHandler {
    async fn handle(&self, nest: Nest, payload: Payload, source: NestName) -> Outcome {
        match payload {
            Payload::Route {
                target,
                kind,
                payload,
            } => forward(&nest, &target, &kind, *payload, Some(&source)).await,
            other => Err(RequestError::Protocol(format!(
                "{} expects a route payload, got {}",
                kinds::ROUTE,
                other.shape()
            ))),
        }
    }
}
