//! Lightweight gateway counters surfaced on the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic request/transaction counters shared across handlers
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Total requests seen by the auth layer
    pub requests_total: AtomicU64,
    /// Requests rejected at the auth layer
    pub auth_failures: AtomicU64,
    /// Requests served through a rotated token
    pub rotations: AtomicU64,
    /// Transactions accepted and forwarded
    pub tx_accepted: AtomicU64,
    /// Transactions rejected at admission
    pub tx_rejected: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tx(&self, accepted: usize) {
        self.tx_accepted.fetch_add(accepted as u64, Ordering::Relaxed);
    }

    pub fn record_tx_rejected(&self) {
        self.tx_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot for the health endpoint
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests_total": self.requests_total.load(Ordering::Relaxed),
            "auth_failures": self.auth_failures.load(Ordering::Relaxed),
            "rotations": self.rotations.load(Ordering::Relaxed),
            "tx_accepted": self.tx_accepted.load(Ordering::Relaxed),
            "tx_rejected": self.tx_rejected.load(Ordering::Relaxed),
        })
    }
}
