//! Transport abstraction for nest-to-nest requests
//!
//! The [`Transport`] trait is the unreliable point-to-point primitive every
//! protocol is layered on. A send is handed off and the caller moves on;
//! if the request reaches the target's handler, its single outcome comes
//! back on the reply channel. If it is lost, nothing ever arrives there,
//! and timeout/retry is the caller's business.
//!
//! ## Implementations
//!
//! - [`SimTransport`](crate::SimTransport): In-memory lossy transport

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Outcome;
use crate::identity::NestName;
use crate::message::Request;

/// Channel on which a delivered request's outcome is returned
pub type ReplySender = mpsc::Sender<Outcome>;

/// A frame waiting in a nest's inbox
#[derive(Debug)]
pub struct Delivery {
    /// Postcard-encoded [`Request`]
    pub frame: Vec<u8>,
    /// Where to send the handler's outcome
    pub reply: ReplySender,
}

/// Transport trait for requests between neighboring nests
#[async_trait]
pub trait Transport: Send + Sync {
    /// The nest this transport sends from
    fn local(&self) -> &NestName;

    /// Hand a request off for delivery
    ///
    /// At most one outcome is sent on `reply` per call. A lost request
    /// produces none; a closed `reply` channel is not an error.
    async fn send(&self, request: Request, reply: ReplySender);

    /// Check whether a nest is a direct neighbor
    fn is_connected(&self, peer: &str) -> bool;
}
