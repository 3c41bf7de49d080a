//! Topology discovery by flooding neighbor lists
//!
//! Each table starts out holding only its own nest's entry. An entry is
//! relayed onward only when it changes the receiving table, so a flood dies
//! out once every table in a component holds the same content.

use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use tracing::{debug, info};

use rookery_core::{NestName, NetworkError, NetworkResult, Outcome, Payload, RequestError, kinds};
use rookery_node::{HandlerRegistry, Nest, Network};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) fn register(registry: &HandlerRegistry) {
    registry.register_fn(kinds::CONNECTIONS, handle_connections);
}

/// Merge a neighbor list announced by `name`, relaying it if new
pub fn handle_connections(nest: &Nest, payload: Payload, source: &NestName) -> Outcome {
    let (name, neighbors) = match payload {
        Payload::Connections { name, neighbors } => (name, neighbors),
        other => {
            return Err(RequestError::Protocol(format!(
                "{} expects a connections payload, got {}",
                kinds::CONNECTIONS,
                other.shape()
            )));
        }
    };

    let changed = nest.with_state(|state| state.connections.merge(&name, &neighbors));
    if !changed {
        debug!(nest = %nest.name(), about = %name, from = %source, "Topology entry unchanged");
        return Ok(Payload::Empty);
    }

    info!(
        nest = %nest.name(),
        about = %name,
        from = %source,
        neighbors = neighbors.len(),
        "Topology entry updated"
    );
    nest.flood(
        kinds::CONNECTIONS,
        Payload::Connections { name, neighbors },
        Some(source),
    );
    Ok(Payload::Empty)
}

/// Broadcast `nest`'s own neighbor list to all of its neighbors
pub fn announce(nest: &Nest) -> usize {
    let payload = Payload::Connections {
        name: nest.name().clone(),
        neighbors: nest.neighbors().to_vec(),
    };
    nest.flood(kinds::CONNECTIONS, payload, None)
}

/// Make every nest announce itself
pub fn start_topology(network: &Network) {
    info!(nests = network.len(), "Starting topology discovery");
    network.everywhere(|nest| {
        announce(nest);
    });
}

/// Nests reachable from `from` over the true edges, including itself
fn component(network: &Network, from: &Nest) -> BTreeSet<NestName> {
    let mut seen = BTreeSet::from([from.name().clone()]);
    let mut queue = VecDeque::from([from.clone()]);
    while let Some(nest) = queue.pop_front() {
        for neighbor in nest.neighbors() {
            if seen.insert(neighbor.clone()) {
                if let Ok(next) = network.nest(neighbor.as_str()) {
                    queue.push_back(next.clone());
                }
            }
        }
    }
    seen
}

/// Check whether every table holds exactly its component's true entries
pub fn is_converged(network: &Network) -> bool {
    network.nests().all(|nest| {
        let expected = component(network, nest);
        let table = nest.topology();
        table.len() == expected.len()
            && expected.iter().all(|name| {
                network
                    .nest(name.as_str())
                    .is_ok_and(|owner| table.get(name.as_str()) == Some(owner.neighbors()))
            })
    })
}

/// Poll until [`is_converged`] holds or `timeout` elapses
pub async fn wait_for_topology(network: &Network, timeout: Duration) -> NetworkResult<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if is_converged(network) {
            debug!(nests = network.len(), "Topology converged");
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(NetworkError::ConvergenceTimeout(timeout));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
