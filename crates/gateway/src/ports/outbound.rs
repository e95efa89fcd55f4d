//! Outbound ports: the narrow interfaces the gateway consumes.
//!
//! The block processor, ban table, and pause flag live outside this crate;
//! everything here is injected at construction so tests can substitute
//! in-memory doubles.

use crate::domain::types::{KeyId, PauseState, TxHash, TxRecord};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Failure from the ban/pause oracle's side effects
#[derive(Debug, thiserror::Error)]
#[error("oracle error: {0}")]
pub struct OracleError(pub String);

/// The internal processor that owns transaction delivery and records.
///
/// Forwarding is a normal blocking I/O boundary; callers must not hold any
/// gateway lock across these awaits.
#[async_trait]
pub trait ClientTxProcessor: Send + Sync {
    /// Forward a single accepted payload; returns its hash
    async fn process_client_transaction(
        &self,
        payload: Bytes,
        key_id: KeyId,
    ) -> Result<TxHash, String>;

    /// Forward a batch of accepted payloads; one hash per payload, in order
    async fn process_client_tx_batch(
        &self,
        payloads: Vec<Bytes>,
        key_id: KeyId,
    ) -> Result<Vec<TxHash>, String>;

    /// The processor's stored record for a hash, if any
    async fn transaction_record(&self, hash: TxHash) -> Result<Option<TxRecord>, String>;
}

/// Ban table and node-pause flag consulted by the admission gate.
///
/// All calls are cheap and synchronous; admission runs before any network
/// hop to the processor.
pub trait AdmissionOracle: Send + Sync {
    /// Current pause state of the node
    fn node_pause_state(&self) -> PauseState;

    /// Ban expiry for a key, if the key is currently banned
    fn is_key_banned(&self, key_id: KeyId) -> Option<DateTime<Utc>>;

    /// Record a bad-transaction strike against a key
    fn record_bad_transaction(&self, key_id: KeyId) -> Result<(), OracleError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time implementation
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
