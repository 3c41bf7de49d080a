//! # Rookery Gossip
//!
//! Flood dissemination of text messages across a nest mesh.
//!
//! A nest that hears a message for the first time records it and passes it
//! on to every neighbor except the one it came from. A nest that already
//! saw the message drops it, so each nest handles every distinct message
//! exactly once even on cyclic graphs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rookery_node::Network;
//!
//! let network = Network::from_edges([("Big Oak", "Cow Pasture")])?;
//! rookery_gossip::register(network.registry());
//!
//! rookery_gossip::send_gossip(network.nest("Big Oak")?, "hawk overhead");
//! ```

mod protocol;

pub use protocol::{handle_gossip, register, send_gossip};
