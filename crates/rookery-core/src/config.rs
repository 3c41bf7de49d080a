//! Configuration for the simulated network

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};

/// Simulated transport behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Probability in `[0, 1)` that a single send is silently lost
    pub loss_rate: f64,
    /// Lower bound of the per-message delivery delay
    pub min_latency_ms: u64,
    /// Upper bound of the per-message delivery delay
    pub max_latency_ms: u64,
    /// Capacity of each nest's inbox
    pub inbox_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.03,
            min_latency_ms: 10,
            max_latency_ms: 20,
            inbox_capacity: 1024,
        }
    }
}

impl TransportConfig {
    /// A transport that never loses messages and delivers almost at once
    pub fn reliable() -> Self {
        Self {
            loss_rate: 0.0,
            min_latency_ms: 0,
            max_latency_ms: 1,
            ..Default::default()
        }
    }

    pub fn with_loss_rate(mut self, loss_rate: f64) -> Self {
        self.loss_rate = loss_rate;
        self
    }

    pub fn validate(&self) -> NetworkResult<()> {
        if !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(NetworkError::Config(format!(
                "loss_rate must be in [0, 1], got {}",
                self.loss_rate
            )));
        }
        if self.min_latency_ms > self.max_latency_ms {
            return Err(NetworkError::Config(format!(
                "min_latency_ms ({}) exceeds max_latency_ms ({})",
                self.min_latency_ms, self.max_latency_ms
            )));
        }
        if self.inbox_capacity == 0 {
            return Err(NetworkError::Config("inbox_capacity must be non-zero".into()));
        }
        Ok(())
    }
}

/// Retry policy of the request client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Number of delivery attempts before giving up
    pub attempts: u32,
    /// How long each attempt waits for a response
    pub attempt_timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            attempt_timeout_ms: 250,
        }
    }
}

impl RequestConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> NetworkResult<()> {
        if self.attempts == 0 {
            return Err(NetworkError::Config("attempts must be at least 1".into()));
        }
        if self.attempt_timeout_ms == 0 {
            return Err(NetworkError::Config(
                "attempt_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration of a simulated network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub transport: TransportConfig,
    pub request: RequestConfig,
}

impl NetworkConfig {
    /// Lossless network with the standard retry policy
    pub fn reliable() -> Self {
        Self {
            transport: TransportConfig::reliable(),
            request: RequestConfig::default(),
        }
    }

    /// Default latency with the given loss rate
    pub fn lossy(loss_rate: f64) -> Self {
        Self {
            transport: TransportConfig::default().with_loss_rate(loss_rate),
            request: RequestConfig::default(),
        }
    }

    /// Same network with a different per-attempt window
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.request = self.request.with_attempt_timeout(timeout);
        self
    }

    pub fn validate(&self) -> NetworkResult<()> {
        self.transport.validate()?;
        self.request.validate()
    }
}
