use async_trait::async_trait;
use rand::seq::SliceRandom;
use tracing::{Instrument, debug, debug_span, trace};

use rookery_core::{NestName, Outcome, Payload, RequestError, kinds};
use rookery_logging::spans;
use rookery_node::{HandlerRegistry, Nest, RequestHandler};
use rookery_routing::route_request;

/// Register the `storage` handler
pub fn register(registry: &HandlerRegistry) {
    registry.register(kinds::STORAGE, StorageHandler);
}

/// Answers `storage` requests from the nest's own store
pub struct StorageHandler;

#[async_trait]
impl RequestHandler for StorageHandler {
    async fn handle(&self, nest: Nest, payload: Payload, _source: NestName) -> Outcome {
        let key = payload.into_text(kinds::STORAGE)?;
        Ok(nest.store().read(&key).await.into())
    }
}

/// Every nest in `nest`'s topology table other than itself
pub fn candidates(nest: &Nest) -> Vec<NestName> {
    nest.with_state(|state| {
        state
            .connections
            .iter()
            .map(|(name, _)| name)
            .filter(|name| *name != nest.name())
            .cloned()
            .collect()
    })
}

/// Find `key` in this nest's store or any other nest it knows of
///
/// Remote nests are asked in random order, each at most once. An absent key
/// or a failed query moves on to the next nest. Fails with
/// [`RequestError::NotFound`] once every known nest has been asked.
pub async fn find_in_storage(nest: &Nest, key: &str) -> Outcome {
    if let Some(value) = nest.store().read(key).await {
        trace!(nest = %nest.name(), key, "Found locally");
        return Ok(Payload::Text(value));
    }

    let mut candidates = candidates(nest);
    candidates.shuffle(&mut rand::rng());

    let span = debug_span!(spans::LOOKUP, nest = %nest.name(), key, known = candidates.len());
    async move {
        let mut queried = 0;
        for candidate in &candidates {
            queried += 1;
            match route_request(nest, candidate, kinds::STORAGE, Payload::text(key)).await {
                Ok(Payload::Text(value)) => {
                    debug!(at = %candidate, queried, "Found");
                    return Ok(Payload::Text(value));
                }
                Ok(_) => trace!(at = %candidate, "Absent"),
                Err(e) => debug!(at = %candidate, error = %e, "Query failed"),
            }
        }

        debug!(queried, "Not found anywhere");
        Err(RequestError::NotFound {
            key: key.to_string(),
            queried,
        })
    }
    .instrument(span)
    .await
}
