//! Handlers every network starts with: `note` and `ping`

use tokio::task::JoinSet;
use tracing::debug;

use rookery_core::{NestName, Outcome, Payload, kinds};

use crate::handler::HandlerRegistry;
use crate::nest::Nest;

fn note(nest: &Nest, payload: Payload, source: &NestName) -> Outcome {
    let content = payload.into_text(kinds::NOTE)?;
    Ok(Payload::Text(format!(
        "{} received note from {}: {}",
        nest.name(),
        source,
        content
    )))
}

fn ping(_nest: &Nest, _payload: Payload, _source: &NestName) -> Outcome {
    Ok(Payload::text("pong"))
}

impl HandlerRegistry {
    /// Registry holding only the built-in handlers
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        register_builtins(&registry);
        registry
    }
}

pub fn register_builtins(registry: &HandlerRegistry) {
    registry.register_fn(kinds::NOTE, note);
    registry.register_fn(kinds::PING, ping);
}

/// Ping every neighbor at once; the ones that answered, in neighbor order
pub async fn available_neighbors(nest: &Nest) -> Vec<NestName> {
    let mut pings = JoinSet::new();
    for (index, neighbor) in nest.neighbors().iter().enumerate() {
        let nest = nest.clone();
        let neighbor = neighbor.clone();
        pings.spawn(async move {
            let answered = nest.request(&neighbor, kinds::PING, ()).await.is_ok();
            (index, neighbor, answered)
        });
    }

    let mut available = Vec::new();
    while let Some(result) = pings.join_next().await {
        if let Ok((index, neighbor, true)) = result {
            available.push((index, neighbor));
        }
    }
    available.sort_by_key(|(index, _)| *index);

    debug!(
        nest = %nest.name(),
        available = available.len(),
        total = nest.neighbors().len(),
        "Pinged neighbors"
    );
    available.into_iter().map(|(_, neighbor)| neighbor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;
    use rookery_core::{NetworkConfig, RequestError};
    use std::time::Duration;

    #[tokio::test]
    async fn test_note_reply_names_receiver_and_source() {
        let network = Network::builder()
            .edge("Big Oak", "Cow Pasture")
            .config(NetworkConfig::reliable())
            .build()
            .unwrap();
        let oak = network.nest("Big Oak").unwrap();

        let reply = oak.request(&"Cow Pasture".into(), kinds::NOTE, "caw").await;
        assert_eq!(
            reply,
            Ok(Payload::text("Cow Pasture received note from Big Oak: caw"))
        );
    }

    #[tokio::test]
    async fn test_note_needs_text() {
        let network = Network::builder()
            .edge("A", "B")
            .config(NetworkConfig::reliable())
            .build()
            .unwrap();
        let a = network.nest("A").unwrap();

        let reply = a.request(&"B".into(), kinds::NOTE, ()).await;
        let error = tokio_test::assert_err!(reply);
        assert!(matches!(error, RequestError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_available_neighbors_in_order() {
        let network = Network::builder()
            .edges([("A", "D"), ("A", "B"), ("A", "C")])
            .config(NetworkConfig::reliable())
            .build()
            .unwrap();
        let a = network.nest("A").unwrap();

        let available = available_neighbors(a).await;
        assert_eq!(available, vec![NestName::from("D"), "B".into(), "C".into()]);
    }

    #[tokio::test]
    async fn test_unresponsive_neighbor_left_out() {
        let network = Network::builder()
            .edges([("A", "B"), ("A", "C")])
            .config(NetworkConfig::reliable().with_attempt_timeout(Duration::from_millis(20)))
            .build()
            .unwrap();
        // C answers pings with a failure
        network
            .registry()
            .register_fn(kinds::PING, |nest, _payload, _source| {
                if nest.name() == "C" {
                    Err(RequestError::handler(nest.name(), "asleep"))
                } else {
                    Ok(Payload::text("pong"))
                }
            });
        let a = network.nest("A").unwrap();

        assert_eq!(available_neighbors(a).await, vec![NestName::from("B")]);
    }
}
