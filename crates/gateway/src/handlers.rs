//! HTTP handlers for the client API.
//!
//! Admission and auth failures are resolved here and returned as structured
//! errors with stable codes; processor errors pass through verbatim.
//! Rejections are synchronous; outcome resolution is always a separate,
//! repeatable status query.

use crate::auth::session::AuthSession;
use crate::confirm::TxConfirmation;
use crate::domain::claims::{account_address, Identity, SessionClaims};
use crate::domain::config::GatewayConfig;
use crate::domain::error::{ApiError, GatewayError, GatewayResult};
use crate::domain::types::{KeyId, TxHash, TxOutcome};
use crate::ingress::TxIngress;
use crate::middleware::GatewayMetrics;
use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use bytes::Bytes;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Most hashes accepted by one status query
const MAX_STATUS_BATCH: usize = 100;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<AuthSession>,
    pub ingress: Arc<TxIngress>,
    pub confirm: Arc<TxConfirmation>,
    pub metrics: Arc<GatewayMetrics>,
    pub config: Arc<GatewayConfig>,
}

// ─── Token issuance ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UidResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub network_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecosystem_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire: Option<i64>,
}

/// `GET /api/v2/getuid`
///
/// With no usable identity, mints the short-lived anonymous token that
/// bootstraps the login handshake. A caller already holding a valid
/// non-anonymous token gets its remaining expiry back instead of a new
/// session.
pub async fn getuid(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UidResponse>, ApiError> {
    let network_id = state.config.network.network_id.to_string();

    if let Some(claims) = identity.claims() {
        if claims.is_logged_in() {
            return Ok(Json(UidResponse {
                uid: None,
                token: None,
                network_id,
                ecosystem_id: Some(claims.ecosystem_id.clone()),
                key_id: Some(claims.key_id.clone()),
                expire: Some(state.session.remaining(claims).num_seconds()),
            }));
        }
    }

    let issued = state.session.issue_anonymous()?;
    Ok(Json(UidResponse {
        uid: Some(issued.claims.uid.clone()),
        token: Some(issued.token),
        network_id,
        ecosystem_id: None,
        key_id: None,
        expire: None,
    }))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Hex-encoded secp256k1 public key
    pub pubkey: String,
    /// Hex-encoded compact signature over `"LOGIN" + network_id + uid`
    pub signature: String,
    #[serde(default)]
    pub ecosystem_id: Option<String>,
    #[serde(default)]
    pub role_id: Option<String>,
    #[serde(default)]
    pub is_mobile: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub ecosystem_id: String,
    pub key_id: String,
    pub account_id: String,
    pub expire: i64,
}

/// `POST /api/v2/login`
///
/// Completes the handshake started by `getuid`: the caller proves key
/// ownership by signing the UID nonce embedded in its anonymous token.
pub async fn login(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let claims = identity.claims().ok_or(GatewayError::Unauthorized)?;
    if claims.uid.is_empty() {
        return Err(GatewayError::Unauthorized.into());
    }

    let pubkey = hex::decode(&req.pubkey)
        .map_err(|e| GatewayError::InvalidRequest(format!("pubkey is not hex: {}", e)))?;
    let signature = hex::decode(&req.signature)
        .map_err(|e| GatewayError::InvalidRequest(format!("signature is not hex: {}", e)))?;

    let message = format!(
        "LOGIN{}{}",
        state.config.network.network_id, claims.uid
    );
    verify_login_signature(&pubkey, &signature, message.as_bytes())?;

    let key_id = key_id_from_pubkey(&pubkey);
    let account_id = account_address(key_id);
    let ecosystem_id = req
        .ecosystem_id
        .unwrap_or_else(|| state.config.network.default_ecosystem.clone());

    let issued = state.session.issue_authenticated(SessionClaims {
        uid: claims.uid.clone(),
        ecosystem_id: ecosystem_id.clone(),
        key_id: key_id.to_string(),
        account_id: account_id.clone(),
        role_id: req.role_id.unwrap_or_default(),
        is_mobile: req.is_mobile,
        exp: 0,
    })?;

    info!(key_id, ecosystem_id = %ecosystem_id, "login completed");
    Ok(Json(LoginResponse {
        expire: state.session.remaining(&issued.claims).num_seconds(),
        token: issued.token,
        ecosystem_id,
        key_id: key_id.to_string(),
        account_id,
    }))
}

/// Verify a login signature against the key being claimed
fn verify_login_signature(pubkey: &[u8], signature: &[u8], message: &[u8]) -> GatewayResult<()> {
    let secp = Secp256k1::verification_only();
    let pubkey = PublicKey::from_slice(pubkey)
        .map_err(|e| GatewayError::Signature(format!("invalid public key: {}", e)))?;
    let signature = Signature::from_compact(signature)
        .map_err(|e| GatewayError::Signature(format!("invalid signature encoding: {}", e)))?;
    let digest = Sha256::digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    secp.verify_ecdsa(&message, &signature, &pubkey)
        .map_err(|_| GatewayError::Signature("login signature verification failed".into()))
}

/// Derive the numeric key id from a public key: first 8 bytes of the
/// SHA-256 digest, big-endian, sign bit cleared.
fn key_id_from_pubkey(pubkey: &[u8]) -> KeyId {
    let digest = Sha256::digest(pubkey);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(prefix) & i64::MAX
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SendTxResponse {
    pub hashes: HashMap<String, String>,
}

/// `POST /api/v2/sendTx`
///
/// Multipart submission: each field name is an opaque correlation key, each
/// field body a raw signed transaction. A `nowait` form field skips the
/// bounded post-submission wait.
pub async fn send_tx(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<Json<SendTxResponse>, ApiError> {
    let key_id = identity.key_id().ok_or(GatewayError::Unauthorized)?;

    let mut payloads: Vec<(String, Bytes)> = Vec::new();
    let mut nowait = false;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| GatewayError::InvalidRequest(format!("malformed multipart field: {}", e)))?;
        if name == "nowait" {
            nowait = true;
            continue;
        }
        payloads.push((name, data));
    }

    let hashes = match state.ingress.accept_batch(payloads, key_id, nowait).await {
        Ok(hashes) => hashes,
        Err(e) => {
            state.metrics.record_tx_rejected();
            return Err(e.into());
        }
    };
    state.metrics.record_tx(hashes.len());

    if !nowait {
        await_settlement(&state, hashes.values().copied()).await?;
    }

    Ok(Json(SendTxResponse {
        hashes: hashes
            .into_iter()
            .map(|(key, hash)| (key, hash.to_string()))
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SendSignedTxRequest {
    /// Hex-encoded relayed envelope
    pub data: String,
    #[serde(default)]
    pub nowait: bool,
}

/// `POST /api/v2/sendSignedTx`
///
/// Pre-signed, third-party-relayed submission. The ban and size checks key
/// on the id embedded in the envelope, not the relaying session.
pub async fn send_signed_tx(
    State(state): State<AppState>,
    Json(req): Json<SendSignedTxRequest>,
) -> Result<Json<SendTxResponse>, ApiError> {
    let payload = hex::decode(&req.data)
        .map_err(|e| GatewayError::InvalidRequest(format!("payload is not hex: {}", e)))?;

    let hash = match state
        .ingress
        .accept_signed(Bytes::from(payload), req.nowait)
        .await
    {
        Ok(hash) => hash,
        Err(e) => {
            state.metrics.record_tx_rejected();
            return Err(e.into());
        }
    };
    state.metrics.record_tx(1);

    if !req.nowait {
        await_settlement(&state, std::iter::once(hash)).await?;
    }

    let mut hashes = HashMap::new();
    hashes.insert(hash.to_string(), hash.to_string());
    Ok(Json(SendTxResponse { hashes }))
}

/// Bounded wait for accepted hashes to settle.
///
/// A terminal penalty/failure becomes the response error; exhaustion is
/// logged and tolerated, since resolution stays available through the
/// status endpoint.
async fn await_settlement(
    state: &AppState,
    hashes: impl Iterator<Item = TxHash>,
) -> Result<(), ApiError> {
    for hash in hashes {
        match state
            .confirm
            .wait_for(
                hash,
                state.config.status.send_wait_attempts,
                state.config.status.poll_interval,
            )
            .await
        {
            Ok(_) => {}
            Err(GatewayError::Timeout { attempts }) => {
                warn!(hash = %hash, attempts, "transaction not settled before reply");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TxStatusRequest {
    pub hashes: Vec<String>,
}

/// One per-hash entry in the status response; an empty `blockid` means the
/// hash is not yet resolved.
#[derive(Debug, Serialize, Deserialize)]
pub struct TxStatusEntry {
    pub blockid: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
    pub penalty: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TxStatusResponse {
    pub results: HashMap<String, TxStatusEntry>,
}

/// `POST /api/v2/txstatus`
///
/// Per-hash independent resolution; one malformed hash yields an error entry
/// for that hash without aborting the batch.
pub async fn txstatus(
    State(state): State<AppState>,
    Json(req): Json<TxStatusRequest>,
) -> Result<Json<TxStatusResponse>, ApiError> {
    if req.hashes.is_empty() {
        return Err(GatewayError::InvalidRequest("empty hash list".into()).into());
    }
    if req.hashes.len() > MAX_STATUS_BATCH {
        return Err(GatewayError::InvalidRequest(format!(
            "too many hashes in one request (max {})",
            MAX_STATUS_BATCH
        ))
        .into());
    }

    let outcomes = state.confirm.status_batch(&req.hashes).await;
    let results = outcomes
        .into_iter()
        .map(|(hash, outcome)| (hash, status_entry(outcome)))
        .collect();

    Ok(Json(TxStatusResponse { results }))
}

fn status_entry(outcome: GatewayResult<TxOutcome>) -> TxStatusEntry {
    match outcome {
        Ok(TxOutcome::Pending) => TxStatusEntry {
            blockid: String::new(),
            result: String::new(),
            errmsg: None,
            penalty: 0,
        },
        Ok(TxOutcome::Included { block_id, result }) => TxStatusEntry {
            blockid: block_id,
            result,
            errmsg: None,
            penalty: 0,
        },
        Ok(TxOutcome::Penalized { block_id, errmsg }) => TxStatusEntry {
            blockid: block_id,
            result: String::new(),
            errmsg: Some(errmsg),
            penalty: 1,
        },
        Ok(TxOutcome::Failed { errmsg }) => TxStatusEntry {
            blockid: String::new(),
            result: String::new(),
            errmsg: Some(errmsg),
            penalty: 0,
        },
        Err(e) => TxStatusEntry {
            blockid: String::new(),
            result: String::new(),
            errmsg: Some(e.to_string()),
            penalty: 0,
        },
    }
}

// ─── Health ──────────────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "metrics": state.metrics.to_json(),
    }))
}
