//! Admission gate: the synchronous policy check ahead of any forwarding.
//!
//! Three ordered checks, short-circuiting on the first failure. Pause state
//! outranks everything (the processor cannot accept work while upgrading or
//! stopping), then the ban table, then the size ceiling. The decision is
//! derived fresh per request and never stored.

use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{KeyId, PauseState};
use crate::ports::outbound::AdmissionOracle;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, warn};

/// Why a submission was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NodePaused(PauseState),
    Banned { key_id: KeyId, until: DateTime<Utc> },
    Oversized { size: u64, limit: u64 },
}

/// Accept/reject, computed per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Accept,
    Reject(RejectReason),
}

impl AdmissionDecision {
    /// Convert into a gateway error for the reject case
    pub fn into_result(self) -> GatewayResult<()> {
        match self {
            AdmissionDecision::Accept => Ok(()),
            AdmissionDecision::Reject(RejectReason::NodePaused(state)) => {
                Err(GatewayError::NodePaused(state))
            }
            AdmissionDecision::Reject(RejectReason::Banned { key_id, until }) => {
                Err(GatewayError::Banned { key_id, until })
            }
            AdmissionDecision::Reject(RejectReason::Oversized { size, limit }) => {
                Err(GatewayError::Oversized { size, limit })
            }
        }
    }
}

/// Per-request admission policy over the ban/pause oracle and size ceiling
pub struct AdmissionGate {
    oracle: Arc<dyn AdmissionOracle>,
    max_tx_size: u64,
}

impl AdmissionGate {
    pub fn new(oracle: Arc<dyn AdmissionOracle>, max_tx_size: u64) -> Self {
        Self {
            oracle,
            max_tx_size,
        }
    }

    /// Decide whether a submission of `size` bytes from `key_id` may proceed.
    ///
    /// An oversized submission also records a bad-transaction strike against
    /// the key: oversized payloads are the signature of abusive clients and
    /// feed the external ban mechanism. A failure of the strike call itself
    /// is logged and does not change the rejection.
    pub fn check(&self, size: u64, key_id: KeyId) -> AdmissionDecision {
        let pause = self.oracle.node_pause_state();
        if !pause.is_none() {
            warn!(state = %pause, "rejecting submission, node paused");
            return AdmissionDecision::Reject(RejectReason::NodePaused(pause));
        }

        if let Some(until) = self.oracle.is_key_banned(key_id) {
            warn!(key_id, until = %until, "rejecting submission from banned key");
            return AdmissionDecision::Reject(RejectReason::Banned { key_id, until });
        }

        if size > self.max_tx_size {
            warn!(key_id, size, limit = self.max_tx_size, "rejecting oversized submission");
            if let Err(e) = self.oracle.record_bad_transaction(key_id) {
                error!(key_id, error = %e, "failed to record bad-transaction strike");
            }
            return AdmissionDecision::Reject(RejectReason::Oversized {
                size,
                limit: self.max_tx_size,
            });
        }

        AdmissionDecision::Accept
    }
}
