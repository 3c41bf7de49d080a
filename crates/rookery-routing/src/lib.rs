//! # Rookery Routing
//!
//! Topology discovery and multi-hop routing for a nest mesh.
//!
//! ## Core Components
//!
//! - Topology protocol: every nest broadcasts its own neighbor list and
//!   relays each new or changed entry it hears, so every table converges to
//!   the full graph of its connected component
//! - [`find_route`]: breadth-first search over a topology table for the
//!   first hop toward a destination
//! - [`route_request`]: delivers a request to any nest, directly when it is
//!   a neighbor and otherwise hop by hop through `route` requests
//!
//! ## Example
//!
//! ```rust,ignore
//! use rookery_node::Network;
//!
//! let network = Network::from_edges([("A", "B"), ("B", "C")])?;
//! rookery_routing::register(network.registry());
//!
//! rookery_routing::start_topology(&network);
//! rookery_routing::wait_for_topology(&network, Duration::from_secs(2)).await?;
//!
//! let a = network.nest("A")?;
//! let reply = rookery_routing::route_request(a, &"C".into(), "note", "hi".into()).await?;
//! ```

mod path;
mod router;
mod topology;

pub use path::find_route;
pub use router::{RouteHandler, route_request};
pub use topology::{
    announce, handle_connections, is_converged, start_topology, wait_for_topology,
};

use rookery_node::HandlerRegistry;

/// Register the `connections` and `route` handlers
pub fn register(registry: &HandlerRegistry) {
    topology::register(registry);
    router::register(registry);
}
