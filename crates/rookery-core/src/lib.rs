//! # Rookery Core
//!
//! Core types, errors, and the simulated transport for the Rookery nest mesh.
//!
//! A rookery is a fixed set of named nests, each directly connected to a few
//! neighbors, exchanging typed request/response messages over a transport
//! that may silently lose them. This crate holds everything the protocol
//! crates share:
//!
//! ## Key Types
//!
//! - [`NestName`]: Identity of a nest
//! - [`Payload`] / [`Request`]: Values carried on the wire
//! - [`RequestError`] / [`Outcome`]: The result of a request
//! - [`NestState`]: Per-nest gossip log and topology table
//! - [`NeighborMap`]: Neighbor lists derived from an undirected edge list
//!
//! ## Key Traits
//!
//! - [`Transport`]: Unreliable point-to-point delivery
//! - [`LocalStore`]: External key/value lookup collaborator of a nest
//!
//! [`SimTransport`] is the in-memory lossy implementation used by the
//! simulated network.

pub mod config;
pub mod edges;
pub mod error;
pub mod identity;
pub mod message;
pub mod sim_transport;
pub mod state;
pub mod store;
pub mod transport;

// Re-export main types
pub use config::*;
pub use edges::*;
pub use error::*;
pub use identity::*;
pub use message::*;
pub use sim_transport::*;
pub use state::*;
pub use store::*;
pub use transport::*;
