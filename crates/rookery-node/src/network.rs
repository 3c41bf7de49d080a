//! Building and running a whole simulated network
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rookery_node::Network;
//!
//! let network = Network::builder()
//!     .edges([("Big Oak", "Cow Pasture"), ("Cow Pasture", "Fence Post")])
//!     .build()?;
//!
//! let oak = network.nest("Big Oak")?;
//! let reply = oak.request(&"Cow Pasture".into(), "note", "caw").await?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use rookery_core::{
    LocalStore, MemoryStore, NeighborMap, NestName, NetworkConfig, NetworkError, NetworkResult,
    SimTransportBuilder, Transport, TransportStats,
};

use crate::handler::HandlerRegistry;
use crate::nest::Nest;

/// Builder for a [`Network`]
pub struct NetworkBuilder {
    edges: NeighborMap,
    config: NetworkConfig,
    stores: HashMap<NestName, Arc<dyn LocalStore>>,
    registry: Option<HandlerRegistry>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self {
            edges: NeighborMap::new(),
            config: NetworkConfig::default(),
            stores: HashMap::new(),
            registry: None,
        }
    }

    /// Connect two nests, adding them if needed
    pub fn edge(mut self, a: impl Into<NestName>, b: impl Into<NestName>) -> Self {
        self.edges.connect(a.into(), b.into());
        self
    }

    pub fn edges<A, B>(mut self, edges: impl IntoIterator<Item = (A, B)>) -> Self
    where
        A: Into<NestName>,
        B: Into<NestName>,
    {
        for (a, b) in edges {
            self.edges.connect(a.into(), b.into());
        }
        self
    }

    /// Add a nest that may have no neighbors
    pub fn nest(mut self, name: impl Into<NestName>) -> Self {
        self.edges.add_nest(name.into());
        self
    }

    pub fn config(mut self, config: NetworkConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a store to one nest; the rest get an empty [`MemoryStore`]
    pub fn store(mut self, name: impl Into<NestName>, store: Arc<dyn LocalStore>) -> Self {
        self.stores.insert(name.into(), store);
        self
    }

    /// Use this registry instead of one with only the built-in handlers
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Create every nest and start its inbox loop
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(mut self) -> NetworkResult<Network> {
        self.config.validate()?;
        if let Some(name) = self.stores.keys().find(|name| !self.edges.contains(name.as_str())) {
            return Err(NetworkError::UnknownNest(name.to_string()));
        }

        let registry = self.registry.unwrap_or_else(HandlerRegistry::with_builtins);
        let transports = SimTransportBuilder::new(self.config.transport.clone());
        let stats = transports.stats();
        let transports = transports.build(&self.edges);
        let (shutdown, _) = broadcast::channel(1);

        let mut nests = BTreeMap::new();
        let mut tasks = Vec::with_capacity(transports.len());
        for (name, neighbors) in self.edges.iter() {
            let Some(transport) = transports.get(name) else {
                continue;
            };
            let store = self
                .stores
                .remove(name)
                .unwrap_or_else(|| Arc::new(MemoryStore::new()));
            let nest = Nest::new(
                Arc::clone(transport) as Arc<dyn Transport>,
                neighbors.to_vec(),
                store,
                registry.clone(),
                self.config.request.clone(),
            );
            tasks.push(nest.serve(Arc::clone(transport), shutdown.subscribe()));
            nests.insert(name.clone(), nest);
        }

        info!(
            nests = nests.len(),
            edges = self.edges.edge_count(),
            loss_rate = self.config.transport.loss_rate,
            "Network started"
        );

        Ok(Network {
            nests,
            registry,
            stats,
            config: self.config,
            shutdown,
            tasks,
        })
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running set of nests sharing one transport fabric
///
/// Dropping the network stops every inbox loop.
pub struct Network {
    nests: BTreeMap<NestName, Nest>,
    registry: HandlerRegistry,
    stats: Arc<TransportStats>,
    config: NetworkConfig,
    shutdown: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl Network {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    /// Build a network with the default configuration from undirected edges
    pub fn from_edges<A, B>(edges: impl IntoIterator<Item = (A, B)>) -> NetworkResult<Self>
    where
        A: Into<NestName>,
        B: Into<NestName>,
    {
        Self::builder().edges(edges).build()
    }

    pub fn nest(&self, name: &str) -> NetworkResult<&Nest> {
        self.nests
            .get(name)
            .ok_or_else(|| NetworkError::UnknownNest(name.to_string()))
    }

    /// All nests, ordered by name
    pub fn nests(&self) -> impl Iterator<Item = &Nest> {
        self.nests.values()
    }

    pub fn names(&self) -> Vec<NestName> {
        self.nests.keys().cloned().collect()
    }

    /// Run `f` against every nest
    pub fn everywhere(&self, mut f: impl FnMut(&Nest)) {
        for nest in self.nests.values() {
            f(nest);
        }
    }

    /// Handlers shared by every nest
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Transport counters for the whole network
    pub fn stats(&self) -> &Arc<TransportStats> {
        &self.stats
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nests.is_empty()
    }

    /// Stop every inbox loop; in-flight handlers run to completion
    ///
    /// Each loop closes its inbox on the way out, so later requests to a
    /// stopped nest time out without leaving deliveries queued.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("nests", &self.names())
            .field("config", &self.config)
            .finish()
    }
}
