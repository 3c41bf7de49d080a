//! A single nest: identity, neighbors, mutable state and outbound client

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use rookery_core::{
    Delivery, LocalStore, NestName, NestState, Outcome, Payload, Request, RequestConfig,
    SimTransport, TopologyTable, Transport,
};

use crate::client::RequestClient;
use crate::handler::HandlerRegistry;

struct NestInner {
    name: NestName,
    /// Direct neighbors in edge declaration order
    neighbors: Vec<NestName>,
    state: Mutex<NestState>,
    store: Arc<dyn LocalStore>,
    client: RequestClient,
    registry: HandlerRegistry,
}

/// Handle to a nest, passed to every handler running on it
///
/// Cloning shares the same nest.
#[derive(Clone)]
pub struct Nest {
    inner: Arc<NestInner>,
}

impl Nest {
    pub fn new(
        transport: Arc<dyn Transport>,
        neighbors: Vec<NestName>,
        store: Arc<dyn LocalStore>,
        registry: HandlerRegistry,
        config: RequestConfig,
    ) -> Self {
        let name = transport.local().clone();
        let state = NestState::new(&name, &neighbors);
        Self {
            inner: Arc::new(NestInner {
                name,
                neighbors,
                state: Mutex::new(state),
                store,
                client: RequestClient::new(transport, config),
                registry,
            }),
        }
    }

    pub fn name(&self) -> &NestName {
        &self.inner.name
    }

    pub fn neighbors(&self) -> &[NestName] {
        &self.inner.neighbors
    }

    /// Whether the transport links this nest directly to `name`
    pub fn is_neighbor(&self, name: &str) -> bool {
        self.inner.client.transport().is_connected(name)
    }

    /// External key/value collaborator of this nest
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.inner.store
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    pub fn client(&self) -> &RequestClient {
        &self.inner.client
    }

    /// Run `f` with the state locked
    ///
    /// Compare-then-update must happen inside one call. Never await inside.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut NestState) -> R) -> R {
        f(&mut self.inner.state.lock())
    }

    /// Snapshot of the topology table
    pub fn topology(&self) -> TopologyTable {
        self.with_state(|state| state.connections.clone())
    }

    /// Request a direct neighbor with retries
    pub async fn request(
        &self,
        target: &NestName,
        kind: &str,
        payload: impl Into<Payload>,
    ) -> Outcome {
        self.inner.client.request(target, kind, payload.into()).await
    }

    /// Send to every neighbor except `except` without waiting
    ///
    /// Each send runs in its own task; failures are logged and dropped.
    /// Returns the number of sends started.
    pub fn flood(&self, kind: &str, payload: Payload, except: Option<&NestName>) -> usize {
        let mut started = 0;
        for neighbor in self.neighbors() {
            if except == Some(neighbor) {
                continue;
            }
            let nest = self.clone();
            let target = neighbor.clone();
            let kind = kind.to_string();
            let payload = payload.clone();
            tokio::spawn(async move {
                if let Err(e) = nest.request(&target, &kind, payload).await {
                    warn!(
                        nest = %nest.name(),
                        to = %target,
                        kind = %kind,
                        error = %e,
                        "Flood send failed"
                    );
                }
            });
            started += 1;
        }
        trace!(nest = %self.name(), kind, started, "Flooded neighbors");
        started
    }

    /// Dispatch a request to this nest's own handlers
    pub async fn dispatch_local(&self, kind: &str, payload: Payload, source: &NestName) -> Outcome {
        self.inner
            .registry
            .dispatch(self, kind, payload, source)
            .await
    }

    /// Spawn the inbox loop
    ///
    /// Every delivery is handled in its own task so slow handlers never hold
    /// up the inbox.
    pub fn serve(
        &self,
        transport: Arc<SimTransport>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let nest = self.clone();
        tokio::spawn(async move {
            debug!(nest = %nest.name(), "Inbox loop started");
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!(nest = %nest.name(), "Inbox loop shutting down");
                        break;
                    }
                    delivery = transport.recv() => {
                        let Some(delivery) = delivery else {
                            break;
                        };
                        let nest = nest.clone();
                        tokio::spawn(async move { nest.handle_delivery(delivery).await });
                    }
                }
            }
            transport.close().await;
        })
    }

    async fn handle_delivery(&self, delivery: Delivery) {
        let outcome = match Request::from_bytes(&delivery.frame) {
            Ok(request) => {
                trace!(
                    nest = %self.name(),
                    from = %request.origin,
                    kind = %request.kind,
                    "Delivered"
                );
                self.dispatch_local(&request.kind, request.payload, &request.origin)
                    .await
            }
            Err(e) => {
                warn!(nest = %self.name(), error = %e, "Undecodable frame");
                Err(e.into())
            }
        };
        // A closed reply channel means the request already settled
        let _ = delivery.reply.send(outcome).await;
    }
}

impl std::fmt::Debug for Nest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nest")
            .field("name", &self.inner.name)
            .field("neighbors", &self.inner.neighbors)
            .finish()
    }
}
