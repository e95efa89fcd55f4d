//! Core types for the gateway with hex-string serialization on the wire.

use crate::domain::error::GatewayError;
use bytes::Bytes;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Key identifier of a submitting account
pub type KeyId = i64;

/// Content hash identifying a submitted transaction.
///
/// SHA-256 over the raw signed payload; rendered as lower-hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Hash a raw payload
    pub fn compute(payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Parse from the external hex representation
    pub fn from_hex(s: &str) -> Result<Self, GatewayError> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| GatewayError::HashFormat(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(GatewayError::HashFormat(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Node pause state reported by the admission oracle.
///
/// Anything other than `None` means the processor cannot accept work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseState {
    #[default]
    None,
    Upgrading,
    Stopping,
}

impl PauseState {
    /// True when the node is accepting transactions
    pub fn is_none(&self) -> bool {
        matches!(self, PauseState::None)
    }
}

impl fmt::Display for PauseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseState::None => write!(f, "none"),
            PauseState::Upgrading => write!(f, "upgrading"),
            PauseState::Stopping => write!(f, "stopping"),
        }
    }
}

/// One client-submitted transaction, as accepted by ingress.
///
/// The gateway keeps no state about a submission once forwarded; durability
/// and inclusion are the processor's responsibility.
#[derive(Debug, Clone)]
pub struct TxSubmission {
    /// Raw signed payload
    pub payload: Bytes,
    /// Content hash, the submission's identifier from here on
    pub hash: TxHash,
    /// Submitting key
    pub key_id: KeyId,
    /// Skip the bounded post-submission wait
    pub nowait: bool,
}

impl TxSubmission {
    /// Accept a raw payload, hashing its content
    pub fn new(payload: Bytes, key_id: KeyId, nowait: bool) -> Self {
        let hash = TxHash::compute(&payload);
        Self {
            payload,
            hash,
            key_id,
            nowait,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// The processor's stored record for a hash.
///
/// Written by the processor/storage side; read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxRecord {
    /// Block the transaction was included in, if any
    pub block_id: Option<String>,
    /// Success result string
    pub result: Option<String>,
    /// Error payload (verbatim from the processor)
    pub errmsg: Option<String>,
    /// Included but flagged as failed/charged
    pub penalty: bool,
}

/// Resolution of a hash from the gateway's perspective.
///
/// Monotonic: once a block identifier is reported for a hash, later
/// resolutions never regress to `Pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// No record yet
    Pending,
    /// Included with a success result
    Included { block_id: String, result: String },
    /// Included but penalized; the error payload is the result message
    Penalized { block_id: String, errmsg: String },
    /// Failed before block assembly
    Failed { errmsg: String },
}

impl TxOutcome {
    /// True for any terminal state
    pub fn is_resolved(&self) -> bool {
        !matches!(self, TxOutcome::Pending)
    }
}
