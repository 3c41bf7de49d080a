//! Retry-with-timeout wrapper over the unreliable transport
//!
//! One reply channel is shared by every attempt of a request, so a response
//! to an earlier attempt that shows up during a later window still settles
//! it. Once the request settles the receiver is dropped and stragglers hit a
//! closed channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{Instrument, debug, debug_span, trace};

use rookery_core::{NestName, Outcome, Payload, Request, RequestConfig, RequestError, Transport};
use rookery_logging::spans;

/// Sends requests to direct neighbors with bounded retries
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn Transport>,
    config: RequestConfig,
}

impl RequestClient {
    pub fn new(transport: Arc<dyn Transport>, config: RequestConfig) -> Self {
        Self { transport, config }
    }

    /// The nest requests originate from
    pub fn local(&self) -> &NestName {
        self.transport.local()
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send a request and wait for its outcome
    ///
    /// Each attempt waits one window for a response. The first response
    /// received, from any attempt, is returned as is. After the last window
    /// elapses in silence the request fails with [`RequestError::Timeout`].
    pub async fn request(&self, target: &NestName, kind: &str, payload: Payload) -> Outcome {
        let span = debug_span!(
            spans::REQUEST,
            from = %self.local(),
            to = %target,
            kind
        );
        self.request_inner(target, kind, payload)
            .instrument(span)
            .await
    }

    async fn request_inner(&self, target: &NestName, kind: &str, payload: Payload) -> Outcome {
        let attempts = self.config.attempts.max(1);
        let window = self.config.attempt_timeout();
        let request = Request::new(self.local().clone(), target.clone(), kind, payload);

        // Room for one reply per attempt so no transport ever blocks on us
        let (reply_tx, mut reply_rx) = mpsc::channel(attempts as usize);

        for attempt in 1..=attempts {
            trace!(attempt, "Sending attempt");
            self.transport.send(request.clone(), reply_tx.clone()).await;

            match timeout(window, reply_rx.recv()).await {
                Ok(Some(outcome)) => {
                    trace!(attempt, ok = outcome.is_ok(), "Request settled");
                    return outcome;
                }
                // We hold a sender, so the channel cannot close under us
                Ok(None) => {
                    return Err(RequestError::Protocol("reply channel closed".into()));
                }
                Err(_) => {
                    debug!(attempt, window_ms = window.as_millis() as u64, "No response in window");
                }
            }
        }

        debug!(attempts, "Request timed out");
        Err(RequestError::Timeout {
            target: target.clone(),
            attempts,
        })
    }
}
