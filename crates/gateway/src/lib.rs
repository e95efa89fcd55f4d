// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! Chainfront Gateway - the client-facing edge of a blockchain node.
//!
//! Accepts signed transaction envelopes over HTTP, admits or rejects them
//! under size/ban/pause policy, forwards accepted payloads to the internal
//! processor, and lets clients learn the definitive on-chain outcome through
//! a bounded polling protocol. Session tokens are issued short-lived and
//! rotated transparently through a concurrent server-side cache.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        GATEWAY                                 │
//! ├────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────────────────────┐              │
//! │  │            Middleware Stack                  │              │
//! │  │  CORS → Trace → CatchPanic → Limit → Auth    │              │
//! │  └──────────────────────┬───────────────────────┘              │
//! │                         │ Identity                             │
//! │     ┌───────────────────┼──────────────────┐                   │
//! │     ▼                   ▼                  ▼                   │
//! │  getuid/login        sendTx            txstatus                │
//! │  (AuthSession)     (AdmissionGate      (TxConfirmation)        │
//! │      │              → TxIngress)           │                   │
//! │      ▼                  │                  │                   │
//! │  RefreshCache           ▼                  ▼                   │
//! │  (rotations)    ClientTxProcessor   transaction records        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use chainfront_gateway::{GatewayConfig, GatewayService};
//!
//! let mut service = GatewayService::new(config, processor, oracle, time)?;
//! service.start().await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod admission;
pub mod auth;
pub mod confirm;
pub mod domain;
pub mod handlers;
pub mod ingress;
pub mod middleware;
pub mod ports;
pub mod service;

// Re-exports for public API
pub use admission::{AdmissionDecision, AdmissionGate, RejectReason};
pub use auth::{AuthSession, RefreshCache, RefreshEntry, TokenCodec};
pub use confirm::{TxConfirmation, WaitResult};
pub use domain::claims::{Identity, SessionClaims};
pub use domain::config::GatewayConfig;
pub use domain::error::{codes, ApiError, GatewayError, GatewayResult};
pub use domain::types::{KeyId, PauseState, TxHash, TxOutcome, TxRecord};
pub use ingress::TxIngress;
pub use middleware::GatewayMetrics;
pub use ports::outbound::{
    AdmissionOracle, ClientTxProcessor, OracleError, SystemTimeSource, TimeSource,
};
pub use service::GatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client version string reported on the health endpoint
pub fn client_version() -> String {
    format!("Chainfront/v{}/rust", VERSION)
}
