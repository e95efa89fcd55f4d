//! Domain layer: core types, identity, configuration, and errors.

pub mod claims;
pub mod config;
pub mod error;
pub mod types;

pub use claims::{account_address, Identity, SessionClaims};
pub use config::{ConfigError, GatewayConfig};
pub use error::{codes, ApiError, GatewayError, GatewayResult};
pub use types::{KeyId, PauseState, TxHash, TxOutcome, TxRecord, TxSubmission};
