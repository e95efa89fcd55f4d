//! Transaction ingress: decode, admit, forward, correlate.
//!
//! The gateway owns no queue. Acceptance is the only observable effect here;
//! once a payload is forwarded the processor owns delivery. Admission uses
//! the *aggregate* size of a batch so the ceiling cannot be dodged by
//! splitting one oversized transaction across many multipart fields.

use crate::admission::AdmissionGate;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{KeyId, TxHash, TxSubmission};
use crate::ports::outbound::ClientTxProcessor;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Relayed envelopes carry the submitter key id in their first 8 bytes
/// (little-endian i64) ahead of the opaque signed body.
const RELAY_KEY_PREFIX_LEN: usize = 8;

/// Accepts client submissions and forwards them to the processor
pub struct TxIngress {
    gate: AdmissionGate,
    processor: Arc<dyn ClientTxProcessor>,
}

impl TxIngress {
    pub fn new(gate: AdmissionGate, processor: Arc<dyn ClientTxProcessor>) -> Self {
        Self { gate, processor }
    }

    /// Admit a batch of payloads as a unit and forward it.
    ///
    /// Admission is all-or-nothing over the aggregate byte size; a rejected
    /// batch admits no payload. The returned map associates each caller
    /// correlation key with the hash the processor assigned, so submissions
    /// can be matched to outcomes later.
    #[instrument(skip(self, payloads), fields(batch = payloads.len()))]
    pub async fn accept_batch(
        &self,
        payloads: Vec<(String, Bytes)>,
        key_id: KeyId,
        nowait: bool,
    ) -> GatewayResult<HashMap<String, TxHash>> {
        if payloads.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "no transactions in request".into(),
            ));
        }

        let (keys, submissions): (Vec<String>, Vec<TxSubmission>) = payloads
            .into_iter()
            .map(|(key, payload)| (key, TxSubmission::new(payload, key_id, nowait)))
            .unzip();

        let total: u64 = submissions.iter().map(TxSubmission::size).sum();
        self.gate.check(total, key_id).into_result()?;

        // Submissions are consumed by the forward; the gateway keeps nothing.
        let bodies = submissions.into_iter().map(|s| s.payload).collect();
        let hashes = self
            .processor
            .process_client_tx_batch(bodies, key_id)
            .await
            .map_err(GatewayError::Processor)?;

        if hashes.len() != keys.len() {
            return Err(GatewayError::Internal(format!(
                "processor returned {} hashes for {} payloads",
                hashes.len(),
                keys.len()
            )));
        }

        debug!(key_id, nowait, accepted = hashes.len(), "batch forwarded");
        Ok(keys.into_iter().zip(hashes).collect())
    }

    /// Admit one pre-signed, third-party-relayed payload.
    ///
    /// The ban and size checks key on the id embedded in the envelope, not
    /// on the relaying caller's session.
    #[instrument(skip(self, payload), fields(size = payload.len()))]
    pub async fn accept_signed(&self, payload: Bytes, nowait: bool) -> GatewayResult<TxHash> {
        let key_id = relay_key_id(&payload)?;
        let submission = TxSubmission::new(payload, key_id, nowait);
        self.gate.check(submission.size(), key_id).into_result()?;

        debug!(key_id, hash = %submission.hash, "relayed transaction admitted");
        let hash = self
            .processor
            .process_client_transaction(submission.payload, key_id)
            .await
            .map_err(GatewayError::Processor)?;

        Ok(hash)
    }
}

/// Read the embedded submitter key id from a relayed envelope
fn relay_key_id(payload: &[u8]) -> GatewayResult<KeyId> {
    if payload.len() <= RELAY_KEY_PREFIX_LEN {
        return Err(GatewayError::InvalidRequest(
            "relayed envelope too short".into(),
        ));
    }
    let mut prefix = [0u8; RELAY_KEY_PREFIX_LEN];
    prefix.copy_from_slice(&payload[..RELAY_KEY_PREFIX_LEN]);
    Ok(KeyId::from_le_bytes(prefix))
}
