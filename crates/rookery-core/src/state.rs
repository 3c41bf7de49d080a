//! Mutable per-nest state
//!
//! Both structures here only ever grow or change when their content
//! actually differs. That is what lets the gossip and topology floods
//! terminate on cyclic graphs.

use std::collections::{BTreeMap, HashSet};

use crate::identity::NestName;

/// A gossip message as received by a nest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GossipRecord {
    pub message: String,
    pub source: NestName,
}

/// Messages a nest has already relayed
#[derive(Debug, Clone, Default)]
pub struct GossipLog {
    seen: HashSet<String>,
    received: Vec<GossipRecord>,
}

impl GossipLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_seen(&self, message: &str) -> bool {
        self.seen.contains(message)
    }

    /// Mark a message as seen; returns `false` if it already was
    pub fn mark_seen(&mut self, message: &str) -> bool {
        if self.seen.contains(message) {
            return false;
        }
        self.seen.insert(message.to_string())
    }

    /// Mark a message received from a neighbor
    ///
    /// Returns `false` without recording anything if the message was
    /// already seen.
    pub fn receive(&mut self, message: &str, source: &NestName) -> bool {
        if !self.mark_seen(message) {
            return false;
        }
        self.received.push(GossipRecord {
            message: message.to_string(),
            source: source.clone(),
        });
        true
    }

    /// Messages received from neighbors, in arrival order
    pub fn received(&self) -> &[GossipRecord] {
        &self.received
    }

    /// How many times a message was recorded as received
    pub fn times_received(&self, message: &str) -> usize {
        self.received.iter().filter(|r| r.message == message).count()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// A nest's view of the whole graph: nest name to that nest's neighbors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyTable {
    entries: BTreeMap<NestName, Vec<NestName>>,
}

impl TopologyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding exactly one entry: the owner's own neighbor list
    pub fn for_nest(owner: &NestName, neighbors: &[NestName]) -> Self {
        let mut table = Self::new();
        table.entries.insert(owner.clone(), neighbors.to_vec());
        table
    }

    /// Store an entry if its content differs from the current one
    ///
    /// Returns `true` when the table changed.
    pub fn merge(&mut self, name: &NestName, neighbors: &[NestName]) -> bool {
        match self.entries.get(name) {
            Some(current) if current.as_slice() == neighbors => false,
            _ => {
                self.entries.insert(name.clone(), neighbors.to_vec());
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[NestName]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Neighbors of a nest; a missing entry means no known neighbors
    pub fn neighbors_of(&self, name: &str) -> &[NestName] {
        self.get(name).unwrap_or(&[])
    }

    /// Every nest this table knows about
    pub fn network(&self) -> Vec<NestName> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NestName, &[NestName])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a nest mutates while handling requests
#[derive(Debug, Clone)]
pub struct NestState {
    pub gossip: GossipLog,
    pub connections: TopologyTable,
}

impl NestState {
    pub fn new(owner: &NestName, neighbors: &[NestName]) -> Self {
        Self {
            gossip: GossipLog::new(),
            connections: TopologyTable::for_nest(owner, neighbors),
        }
    }
}
