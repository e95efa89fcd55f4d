//! Gateway error types with stable machine-readable codes.
//!
//! Two layers, used the same way throughout the crate:
//! - [`GatewayError`] is the internal taxonomy returned by components.
//! - [`ApiError`] is the client-visible wire shape produced from it.

use crate::domain::types::PauseState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error codes surfaced to clients
pub mod codes {
    pub const TOKEN: &str = "E_TOKEN";
    pub const SIGNATURE: &str = "E_SIGNATURE";
    pub const UNAUTHORIZED: &str = "E_UNAUTHORIZED";
    pub const HASH: &str = "E_HASH";
    pub const LIMIT_TX_SIZE: &str = "E_LIMITTXSIZE";
    pub const BANNED: &str = "E_BANNED";
    pub const NODE_PAUSED: &str = "E_NODEPAUSED";
    pub const TIMEOUT: &str = "E_TIMEOUT";
    pub const PROCESSOR: &str = "E_PROCESSOR";
    pub const INVALID_REQUEST: &str = "E_REQUEST";
    pub const INTERNAL: &str = "E_INTERNAL";
}

/// Internal gateway errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// Authorization header present but not `Bearer <token>`
    #[error("malformed authorization header")]
    AuthFormat,

    /// Bad signature, disallowed algorithm, or expired claims
    #[error("invalid token: {0}")]
    Signature(String),

    /// Operation requires an authenticated identity
    #[error("authentication required")]
    Unauthorized,

    /// Malformed transaction hash on input
    #[error("malformed transaction hash: {0}")]
    HashFormat(String),

    /// Aggregate payload size above the configured ceiling
    #[error("transaction size {size} exceeds limit {limit}")]
    Oversized { size: u64, limit: u64 },

    /// Submitting key is banned
    #[error("key {key_id} is banned until {until}")]
    Banned { key_id: i64, until: DateTime<Utc> },

    /// Node is not accepting work (upgrade/shutdown in progress)
    #[error("node paused: {0}")]
    NodePaused(PauseState),

    /// Bounded confirmation wait exhausted all attempts
    #[error("transaction not resolved after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// Opaque failure from the external processor, passed through verbatim
    #[error("{0}")]
    Processor(String),

    /// Malformed request body or parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Client-visible error body: `{error, msg, params?}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Machine-readable code (`E_*`)
    pub error: String,
    /// Human-readable message
    pub msg: String,
    /// Optional structured details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: &str, msg: impl Into<String>) -> Self {
        Self {
            error: code.to_string(),
            msg: msg.into(),
            params: None,
        }
    }

    /// Create an API error with structured details
    pub fn with_params(code: &str, msg: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            error: code.to_string(),
            msg: msg.into(),
            params: Some(params),
        }
    }

    /// HTTP status for this error code
    pub fn status_code(&self) -> StatusCode {
        match self.error.as_str() {
            codes::TOKEN | codes::SIGNATURE | codes::UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            codes::BANNED => StatusCode::FORBIDDEN,
            codes::NODE_PAUSED => StatusCode::SERVICE_UNAVAILABLE,
            codes::TIMEOUT => StatusCode::GATEWAY_TIMEOUT,
            codes::INTERNAL => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error, self.msg)
    }
}

impl std::error::Error for ApiError {}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        let msg = e.to_string();
        match e {
            GatewayError::AuthFormat => ApiError::new(codes::TOKEN, msg),
            GatewayError::Signature(_) => ApiError::new(codes::SIGNATURE, msg),
            GatewayError::Unauthorized => ApiError::new(codes::UNAUTHORIZED, msg),
            GatewayError::HashFormat(_) => ApiError::new(codes::HASH, msg),
            GatewayError::Oversized { size, limit } => ApiError::with_params(
                codes::LIMIT_TX_SIZE,
                msg,
                serde_json::json!({ "size": size, "limit": limit }),
            ),
            GatewayError::Banned { until, .. } => ApiError::with_params(
                codes::BANNED,
                msg,
                serde_json::json!({ "until": until.to_rfc3339() }),
            ),
            GatewayError::NodePaused(state) => ApiError::with_params(
                codes::NODE_PAUSED,
                msg,
                serde_json::json!({ "state": state.to_string() }),
            ),
            GatewayError::Timeout { .. } => ApiError::new(codes::TIMEOUT, msg),
            GatewayError::Processor(_) => ApiError::new(codes::PROCESSOR, msg),
            GatewayError::InvalidRequest(_) => ApiError::new(codes::INVALID_REQUEST, msg),
            GatewayError::Config(_) | GatewayError::Bind(_) | GatewayError::Internal(_) => {
                ApiError::new(codes::INTERNAL, msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
