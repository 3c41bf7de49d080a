//! # Rookery Node
//!
//! Runtime for a simulated nest mesh.
//!
//! This crate provides:
//! - [`RequestClient`]: retry-with-timeout requests to direct neighbors
//! - [`HandlerRegistry`]: request type -> handler dispatch, with failures and
//!   panics folded into the returned outcome
//! - [`Nest`]: per-nest identity, state and outbound requests
//! - [`Network`]: builds every nest from an edge list and runs its inbox loop
//! - Built-in `note` and `ping` handlers and [`available_neighbors`]
//!
//! Protocol crates (gossip, routing, storage) register their handlers on
//! [`Network::registry`].

pub mod builtins;
pub mod client;
pub mod handler;
pub mod nest;
pub mod network;

pub use builtins::{available_neighbors, register_builtins};
pub use client::RequestClient;
pub use handler::{HandlerRegistry, RequestHandler};
pub use nest::Nest;
pub use network::{Network, NetworkBuilder};
