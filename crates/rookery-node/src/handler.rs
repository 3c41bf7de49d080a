//! Request handlers and the registry that dispatches to them
//!
//! Handlers are looked up by request type. Whatever a handler does (return a
//! value, return an error, or panic) the caller gets exactly one
//! [`Outcome`] back.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{Instrument, debug_span, warn};

use rookery_core::{NestName, Outcome, Payload, RequestError};
use rookery_logging::spans;

use crate::nest::Nest;

/// Handles one request type on the receiving nest
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle a request delivered to `nest` from its neighbor `source`
    async fn handle(&self, nest: Nest, payload: Payload, source: NestName) -> Outcome;
}

/// Adapter for handlers that finish without awaiting
struct FnHandler<F>(F);

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&Nest, Payload, &NestName) -> Outcome + Send + Sync + 'static,
{
    async fn handle(&self, nest: Nest, payload: Payload, source: NestName) -> Outcome {
        (self.0)(&nest, payload, &source)
    }
}

/// Request type -> handler table shared by every nest of a network
///
/// Cloning is cheap and every clone sees later registrations.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Arc<DashMap<String, Arc<dyn RequestHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler, replacing any previous one for `kind`
    pub fn register(&self, kind: impl Into<String>, handler: impl RequestHandler) {
        self.handlers.insert(kind.into(), Arc::new(handler));
    }

    /// Register a synchronous handler
    pub fn register_fn<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&Nest, Payload, &NestName) -> Outcome + Send + Sync + 'static,
    {
        self.register(kind, FnHandler(handler));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Registered request types, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }

    /// Run the handler for `kind` on `nest`
    ///
    /// The handler runs in its own task so a panic is contained and reported
    /// as [`RequestError::Handler`].
    pub async fn dispatch(
        &self,
        nest: &Nest,
        kind: &str,
        payload: Payload,
        source: &NestName,
    ) -> Outcome {
        // Clone out of the map so no shard lock is held while the handler runs
        let handler = self.handlers.get(kind).map(|e| Arc::clone(e.value()));
        let Some(handler) = handler else {
            warn!(nest = %nest.name(), kind, "No handler registered");
            return Err(RequestError::UnknownType(kind.to_string()));
        };

        let span = debug_span!(spans::DISPATCH, nest = %nest.name(), kind, source = %source);
        let task = {
            let nest = nest.clone();
            let source = source.clone();
            tokio::spawn(async move { handler.handle(nest, payload, source).await }.instrument(span))
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => {
                let reason = panic_message(e.into_panic());
                warn!(nest = %nest.name(), kind, reason = %reason, "Handler panicked");
                Err(RequestError::handler(nest.name(), reason))
            }
            Err(e) => Err(RequestError::handler(nest.name(), e.to_string())),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
