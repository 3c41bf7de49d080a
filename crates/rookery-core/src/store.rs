//! Local key/value storage collaborator of a nest
//!
//! Physical storage lives outside the mesh. A nest only needs to ask its
//! store for a key; absence is a valid answer, not an error.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

/// Key/value lookup owned by one nest
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read a key, returning `None` if it is absent
    async fn read(&self, key: &str) -> Option<String>;
}

/// In-memory store for simulation and tests
///
/// Counts reads so tests can observe how often a nest was queried.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with entries
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.write(key, value);
        }
        store
    }

    pub fn write(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Number of reads served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn read(&self, key: &str) -> Option<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.entries.get(key).map(|entry| entry.value().clone())
    }
}
