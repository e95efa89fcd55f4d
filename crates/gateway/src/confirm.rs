//! Outcome resolution and the bounded confirmation wait.
//!
//! The gateway never pushes outcomes; resolution is always a repeatable
//! status query against the processor's record. `wait_for` is a client-side
//! helper over that query, not a server endpoint.

use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{TxHash, TxOutcome, TxRecord};
use crate::ports::outbound::ClientTxProcessor;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// A successfully included transaction, as returned by [`TxConfirmation::wait_for`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    pub block_id: String,
    pub result: String,
}

/// Translates hashes into caller-facing outcomes
pub struct TxConfirmation {
    processor: Arc<dyn ClientTxProcessor>,
}

impl TxConfirmation {
    pub fn new(processor: Arc<dyn ClientTxProcessor>) -> Self {
        Self { processor }
    }

    /// Current outcome for a hash.
    ///
    /// Outcomes are monotonic: the processor's record never loses its block
    /// identifier, so a hash reported as included stays included.
    pub async fn status(&self, hash: TxHash) -> GatewayResult<TxOutcome> {
        let record = self
            .processor
            .transaction_record(hash)
            .await
            .map_err(GatewayError::Processor)?;
        Ok(resolve(record))
    }

    /// Resolve a batch of hex hashes independently.
    ///
    /// A malformed hash produces an error entry for that hash only; the
    /// rest of the batch still resolves.
    pub async fn status_batch(
        &self,
        hashes: &[String],
    ) -> HashMap<String, GatewayResult<TxOutcome>> {
        let mut results = HashMap::with_capacity(hashes.len());
        for raw in hashes {
            let outcome = match TxHash::from_hex(raw) {
                Ok(hash) => self.status(hash).await,
                Err(e) => Err(e),
            };
            results.insert(raw.clone(), outcome);
        }
        results
    }

    /// Poll `status` until the hash resolves or attempts run out.
    ///
    /// Sleeps `interval` between attempts via the runtime timer, so many
    /// concurrent waits cost no threads. Terminates early on any resolved
    /// outcome; a penalty or pre-inclusion error surfaces as the error
    /// payload, exhaustion as `Timeout`.
    #[instrument(skip(self), fields(hash = %hash))]
    pub async fn wait_for(
        &self,
        hash: TxHash,
        max_attempts: u32,
        interval: Duration,
    ) -> GatewayResult<WaitResult> {
        for attempt in 1..=max_attempts {
            match self.status(hash).await? {
                TxOutcome::Included { block_id, result } => {
                    debug!(attempt, block_id = %block_id, "transaction included");
                    return Ok(WaitResult { block_id, result });
                }
                TxOutcome::Penalized { block_id, errmsg } => {
                    debug!(attempt, block_id = %block_id, "transaction penalized");
                    return Err(GatewayError::Processor(errmsg));
                }
                TxOutcome::Failed { errmsg } => {
                    debug!(attempt, "transaction failed before inclusion");
                    return Err(GatewayError::Processor(errmsg));
                }
                TxOutcome::Pending => {}
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(GatewayError::Timeout {
            attempts: max_attempts,
        })
    }
}

/// Map the processor's record onto an outcome.
///
/// A record with no block identifier but an error payload failed before
/// block assembly; that is a terminal error, not pending.
fn resolve(record: Option<TxRecord>) -> TxOutcome {
    let Some(record) = record else {
        return TxOutcome::Pending;
    };
    match (record.block_id, record.penalty) {
        (Some(block_id), true) => TxOutcome::Penalized {
            block_id,
            errmsg: record.errmsg.unwrap_or_default(),
        },
        (Some(block_id), false) => TxOutcome::Included {
            block_id,
            result: record.result.unwrap_or_default(),
        },
        (None, _) => match record.errmsg {
            Some(errmsg) => TxOutcome::Failed { errmsg },
            None => TxOutcome::Pending,
        },
    }
}
