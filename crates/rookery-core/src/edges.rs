//! Neighbor lists derived from an undirected edge list
//!
//! An edge `A - B` makes `B` a neighbor of `A` and `A` a neighbor of `B`.
//! Neighbor lists keep the order in which edges were declared, which is the
//! order route search breaks ties in.

use std::collections::BTreeMap;

use crate::identity::NestName;

/// Direct neighbors of every nest in a network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborMap {
    neighbors: BTreeMap<NestName, Vec<NestName>>,
}

impl NeighborMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(a, b)` pairs
    pub fn from_edges<A, B>(edges: impl IntoIterator<Item = (A, B)>) -> Self
    where
        A: Into<NestName>,
        B: Into<NestName>,
    {
        let mut map = Self::new();
        for (a, b) in edges {
            map.connect(a.into(), b.into());
        }
        map
    }

    /// Add a nest with no connections (no-op if already present)
    pub fn add_nest(&mut self, name: NestName) {
        self.neighbors.entry(name).or_default();
    }

    /// Add a bidirectional connection
    ///
    /// Self-loops and duplicate edges are ignored.
    pub fn connect(&mut self, a: NestName, b: NestName) {
        if a == b {
            self.add_nest(a);
            return;
        }

        let a_list = self.neighbors.entry(a.clone()).or_default();
        if !a_list.contains(&b) {
            a_list.push(b.clone());
        }
        let b_list = self.neighbors.entry(b).or_default();
        if !b_list.contains(&a) {
            b_list.push(a);
        }
    }

    /// Neighbors of a nest, empty if unknown
    pub fn neighbors(&self, name: &str) -> &[NestName] {
        self.neighbors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        self.neighbors(a).iter().any(|n| n == b)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.neighbors.contains_key(name)
    }

    /// All nest names, sorted
    pub fn names(&self) -> Vec<NestName> {
        self.neighbors.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NestName, &[NestName])> {
        self.neighbors.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.neighbors.values().map(Vec::len).sum::<usize>() / 2
    }
}
