//! Wire values exchanged between nests
//!
//! A [`Request`] is created per call, encoded into a frame by the transport,
//! decoded on the receiving nest and then dropped. The [`Payload`] it
//! carries doubles as the response value.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::identity::NestName;

/// Request type tags understood by the standard handlers
pub mod kinds {
    pub const NOTE: &str = "note";
    pub const PING: &str = "ping";
    pub const GOSSIP: &str = "gossip";
    pub const CONNECTIONS: &str = "connections";
    pub const ROUTE: &str = "route";
    pub const STORAGE: &str = "storage";
}

/// Structured value carried by requests and responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Payload {
    /// No meaningful value (fire-and-forget responses, absent storage keys)
    #[default]
    Empty,
    /// Plain text: notes, gossip messages, storage keys and values
    Text(String),
    /// A nest announcing its neighbor list
    Connections {
        name: NestName,
        neighbors: Vec<NestName>,
    },
    /// A request wrapped for forwarding toward a non-neighbor
    Route {
        target: NestName,
        kind: String,
        payload: Box<Payload>,
    },
}

impl Payload {
    /// Create a text payload
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Borrow the text, if this is a text payload
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Take the text out of a payload expected to carry one
    ///
    /// `kind` names the request type for the error message.
    pub fn into_text(self, kind: &str) -> Result<String, RequestError> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(RequestError::Protocol(format!(
                "{kind} expects a text payload, got {}",
                other.shape()
            ))),
        }
    }

    /// Check if this is the empty payload
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Short name of the variant, for logs and errors
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Connections { .. } => "connections",
            Self::Route { .. } => "route",
        }
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Option<String>> for Payload {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Empty, Self::Text)
    }
}

/// A single request from one nest to a direct neighbor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub origin: NestName,
    pub target: NestName,
    pub kind: String,
    pub payload: Payload,
}

impl Request {
    pub fn new(
        origin: NestName,
        target: NestName,
        kind: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            origin,
            target,
            kind: kind.into(),
            payload,
        }
    }

    /// Serialize to a wire frame
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserialize from a wire frame
    pub fn from_bytes(data: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(data)
    }
}
