//! Error types for the Rookery nest mesh

use std::time::Duration;

use thiserror::Error;

use crate::identity::NestName;
use crate::message::Payload;

/// Why a request failed
///
/// Every failure is returned as a value to the direct caller. A failure in a
/// downstream hop of a routed request travels back through each relaying
/// nest unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Every attempt elapsed without a response. Transport loss only ever
    /// surfaces as this.
    #[error("Request to {target} timed out after {attempts} attempts")]
    Timeout { target: NestName, attempts: u32 },

    /// The handler on the receiving nest failed or panicked
    #[error("Handler failed on {nest}: {reason}")]
    Handler { nest: NestName, reason: String },

    /// No path to the target in the known topology
    #[error("No route from {from} to {to}")]
    Unreachable { from: NestName, to: NestName },

    /// Remote lookup exhausted every known nest
    #[error("Key {key:?} not found after querying {queried} nests")]
    NotFound { key: String, queried: usize },

    /// No handler registered for the request type
    #[error("Unknown request type: {0}")]
    UnknownType(String),

    /// The transport only connects direct neighbors
    #[error("{to} is not reachable from {from}")]
    NotNeighbor { from: NestName, to: NestName },

    /// Malformed frame or unexpected payload shape
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl RequestError {
    /// Create a handler failure for the given nest
    pub fn handler(nest: &NestName, reason: impl Into<String>) -> Self {
        Self::Handler {
            nest: nest.clone(),
            reason: reason.into(),
        }
    }

    /// Check whether this is a retry exhaustion
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<postcard::Error> for RequestError {
    fn from(e: postcard::Error) -> Self {
        Self::Protocol(format!("wire codec: {e}"))
    }
}

/// Result of a single request
pub type Outcome = Result<Payload, RequestError>;

/// Errors raised while building or observing a network
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Nest not found: {0}")]
    UnknownNest(String),

    #[error("Topology did not converge within {0:?}")]
    ConvergenceTimeout(Duration),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for network setup operations
pub type NetworkResult<T> = Result<T, NetworkError>;
