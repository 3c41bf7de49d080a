//! Simulated lossy transport
//!
//! Every nest gets a [`SimTransport`] holding an inbox and channels to the
//! inboxes of its direct neighbors. Each send is independently dropped with
//! the configured probability and otherwise delivered after a random delay.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rookery_core::{NeighborMap, SimTransportBuilder, TransportConfig};
//!
//! let edges = NeighborMap::from_edges([("Big Oak", "Cow Pasture")]);
//! let transports = SimTransportBuilder::new(TransportConfig::reliable()).build(&edges);
//!
//! let oak = &transports["Big Oak"];
//! let (tx, mut rx) = tokio::sync::mpsc::channel(1);
//! oak.send(Request::new(..), tx).await;
//!
//! // The pasture's serve loop picks it up
//! let delivery = transports["Cow Pasture"].recv().await.unwrap();
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tracing::trace;

use crate::config::TransportConfig;
use crate::edges::NeighborMap;
use crate::error::RequestError;
use crate::identity::NestName;
use crate::message::Request;
use crate::transport::{Delivery, ReplySender, Transport};

/// Counters shared by every transport of one network
#[derive(Debug, Default)]
pub struct TransportStats {
    sent: AtomicU64,
    dropped: AtomicU64,
    sent_by_kind: DashMap<String, u64>,
}

impl TransportStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_sent(&self, kind: &str) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        *self.sent_by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Total `send` calls, including lost and rejected ones
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// `send` calls for one request type
    pub fn sent_of(&self, kind: &str) -> u64 {
        self.sent_by_kind.get(kind).map(|count| *count).unwrap_or(0)
    }

    /// Sends lost to simulated loss
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// In-memory transport for one nest
pub struct SimTransport {
    /// Our nest
    local: NestName,
    /// Inbox senders of our direct neighbors
    outgoing: DashMap<NestName, mpsc::Sender<Delivery>>,
    /// Sender side of our own inbox, handed to neighbors
    inbox_tx: mpsc::Sender<Delivery>,
    /// Receiver side of our own inbox
    inbox_rx: Mutex<mpsc::Receiver<Delivery>>,
    config: TransportConfig,
    stats: Arc<TransportStats>,
}

impl SimTransport {
    pub fn new(local: NestName, config: TransportConfig, stats: Arc<TransportStats>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity.max(1));
        Self {
            local,
            outgoing: DashMap::new(),
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            config,
            stats,
        }
    }

    /// Sender for neighbors to reach our inbox
    pub fn inbox_sender(&self) -> mpsc::Sender<Delivery> {
        self.inbox_tx.clone()
    }

    /// Open a one-way link to a neighbor's inbox
    pub fn connect_to(&self, peer: NestName, peer_inbox: mpsc::Sender<Delivery>) {
        self.outgoing.insert(peer, peer_inbox);
    }

    /// Wait for the next frame addressed to us
    ///
    /// Returns `None` only if the inbox is closed.
    pub async fn recv(&self) -> Option<Delivery> {
        self.inbox_rx.lock().await.recv().await
    }

    /// Stop accepting frames and drop the ones still queued
    ///
    /// Pending and later sends to this nest fail at once instead of waiting
    /// for inbox capacity that never frees up.
    pub async fn close(&self) {
        let mut inbox = self.inbox_rx.lock().await;
        inbox.close();
        let mut discarded = 0;
        while inbox.try_recv().is_ok() {
            discarded += 1;
        }
        trace!(nest = %self.local, discarded, "Inbox closed");
    }

    pub fn stats(&self) -> &Arc<TransportStats> {
        &self.stats
    }

    fn is_lost(&self) -> bool {
        self.config.loss_rate > 0.0 && rand::rng().random::<f64>() < self.config.loss_rate
    }

    fn sample_latency(&self) -> Duration {
        let min = self.config.min_latency_ms;
        let max = self.config.max_latency_ms.max(min);
        if max == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[async_trait]
impl Transport for SimTransport {
    fn local(&self) -> &NestName {
        &self.local
    }

    async fn send(&self, request: Request, reply: ReplySender) {
        self.stats.record_sent(&request.kind);

        let inbox = self
            .outgoing
            .get(&request.target)
            .map(|entry| entry.value().clone());
        let Some(inbox) = inbox else {
            let _ = reply
                .send(Err(RequestError::NotNeighbor {
                    from: self.local.clone(),
                    to: request.target,
                }))
                .await;
            return;
        };

        if self.is_lost() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(
                from = %self.local,
                to = %request.target,
                kind = %request.kind,
                "Request lost in transit"
            );
            return;
        }

        let frame = match request.to_bytes() {
            Ok(frame) => frame,
            Err(e) => {
                let _ = reply.send(Err(e.into())).await;
                return;
            }
        };

        let delay = self.sample_latency();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            // A closed inbox drops the frame along with its reply sender
            let _ = inbox.send(Delivery { frame, reply }).await;
        });
    }

    fn is_connected(&self, peer: &str) -> bool {
        self.outgoing.contains_key(peer)
    }
}

/// Builder for the transports of a whole network
pub struct SimTransportBuilder {
    config: TransportConfig,
    stats: Arc<TransportStats>,
}

impl SimTransportBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            stats: Arc::new(TransportStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<TransportStats> {
        Arc::clone(&self.stats)
    }

    /// Create one transport per nest, linked along the given edges
    pub fn build(&self, edges: &NeighborMap) -> HashMap<NestName, Arc<SimTransport>> {
        let transports: HashMap<NestName, Arc<SimTransport>> = edges
            .names()
            .into_iter()
            .map(|name| {
                let transport =
                    SimTransport::new(name.clone(), self.config.clone(), Arc::clone(&self.stats));
                (name, Arc::new(transport))
            })
            .collect();

        for (name, neighbors) in edges.iter() {
            let Some(transport) = transports.get(name) else {
                continue;
            };
            for neighbor in neighbors {
                if let Some(peer) = transports.get(neighbor) {
                    transport.connect_to(neighbor.clone(), peer.inbox_sender());
                }
            }
        }

        transports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;

    fn chain() -> HashMap<NestName, Arc<SimTransport>> {
        let edges = NeighborMap::from_edges([("A", "B"), ("B", "C")]);
        SimTransportBuilder::new(TransportConfig::reliable()).build(&edges)
    }

    #[tokio::test]
    async fn test_delivers_to_neighbor_inbox() {
        let transports = chain();
        let a = &transports["A"];
        let b = &transports["B"];

        let (tx, _rx) = mpsc::channel(1);
        let request = Request::new("A".into(), "B".into(), "note", Payload::text("hi"));
        a.send(request.clone(), tx).await;

        let delivery = b.recv().await.unwrap();
        assert_eq!(tokio_test::assert_ok!(Request::from_bytes(&delivery.frame)), request);
        assert_eq!(a.stats().sent(), 1);
        assert_eq!(a.stats().sent_of("note"), 1);
    }

    #[tokio::test]
    async fn test_non_neighbor_is_rejected() {
        let transports = chain();
        let a = &transports["A"];

        let (tx, mut rx) = mpsc::channel(1);
        a.send(Request::new("A".into(), "C".into(), "ping", Payload::Empty), tx)
            .await;

        let outcome = rx.recv().await.unwrap();
        assert!(matches!(outcome, Err(RequestError::NotNeighbor { .. })));
    }

    #[tokio::test]
    async fn test_links_follow_edges() {
        let transports = chain();
        assert!(transports["A"].is_connected("B"));
        assert!(!transports["A"].is_connected("C"));
        assert!(transports["B"].is_connected("A"));
        assert!(transports["B"].is_connected("C"));
    }

    #[tokio::test]
    async fn test_closed_inbox_releases_senders() {
        let edges = NeighborMap::from_edges([("A", "B")]);
        let mut config = TransportConfig::reliable();
        config.inbox_capacity = 1;
        let transports = SimTransportBuilder::new(config).build(&edges);
        let a = &transports["A"];

        // Fill B's inbox so the next delivery has to wait for room
        let (first_tx, _first_rx) = mpsc::channel(1);
        a.send(Request::new("A".into(), "B".into(), "ping", Payload::Empty), first_tx)
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (tx, mut rx) = mpsc::channel(1);
        a.send(Request::new("A".into(), "B".into(), "ping", Payload::Empty), tx)
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        transports["B"].close().await;

        // The waiting delivery gives up and drops its reply sender
        let closed = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert_eq!(tokio_test::assert_ok!(closed), None);
        assert!(transports["B"].recv().await.is_none());

        let (tx, mut rx) = mpsc::channel(1);
        a.send(Request::new("A".into(), "B".into(), "ping", Payload::Empty), tx)
            .await;
        let closed = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert_eq!(tokio_test::assert_ok!(closed), None);
    }

    #[tokio::test]
    async fn test_lossy_transport_drops_some() {
        let edges = NeighborMap::from_edges([("A", "B")]);
        let config = TransportConfig::reliable().with_loss_rate(0.5);
        let transports = SimTransportBuilder::new(config).build(&edges);
        let a = &transports["A"];

        for _ in 0..200 {
            let (tx, _rx) = mpsc::channel(1);
            a.send(Request::new("A".into(), "B".into(), "ping", Payload::Empty), tx)
                .await;
        }

        let stats = a.stats();
        assert_eq!(stats.sent(), 200);
        assert!(stats.dropped() > 0);
        assert!(stats.dropped() < 200);
    }
}
