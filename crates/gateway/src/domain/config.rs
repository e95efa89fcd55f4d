//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Session token configuration
    pub auth: AuthConfig,
    /// Admission limits
    pub limits: LimitsConfig,
    /// Outcome polling configuration
    pub status: StatusConfig,
    /// Network identity
    pub network: NetworkConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.auth.secret {
            let bytes = hex::decode(secret)
                .map_err(|_| ConfigError::InvalidSecret("secret is not valid hex".into()))?;
            if bytes.len() < 16 {
                return Err(ConfigError::InvalidSecret(
                    "secret must be at least 16 bytes".into(),
                ));
            }
        }

        if self.auth.session_lifetime.as_secs() == 0 {
            return Err(ConfigError::InvalidAuth(
                "session_lifetime cannot be 0".into(),
            ));
        }

        if self.auth.rotation_window >= self.auth.session_lifetime {
            return Err(ConfigError::InvalidAuth(
                "rotation_window must be shorter than session_lifetime".into(),
            ));
        }

        if self.limits.max_tx_size == 0 {
            return Err(ConfigError::InvalidLimit("max_tx_size cannot be 0".into()));
        }

        if self.status.poll_interval.as_millis() == 0 {
            return Err(ConfigError::InvalidStatus("poll_interval cannot be 0".into()));
        }

        if self.status.send_wait_attempts == 0 {
            return Err(ConfigError::InvalidStatus(
                "send_wait_attempts cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 7079)
    pub port: u16,
    /// Max request body size accepted before any parsing, in bytes
    pub max_request_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 7079,
            // Aggregate tx ceiling plus multipart framing overhead
            max_request_size: 2 * 1024 * 1024,
        }
    }
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret, hex-encoded (None = random per process start)
    pub secret: Option<String>,
    /// Lifetime of authenticated session tokens
    #[serde(with = "humantime_serde")]
    pub session_lifetime: Duration,
    /// Lifetime of anonymous bootstrap tokens
    #[serde(with = "humantime_serde")]
    pub anon_lifetime: Duration,
    /// A token within this window of expiry gets rotated
    #[serde(with = "humantime_serde")]
    pub rotation_window: Duration,
    /// How long a rotated entry stays resolvable in the refresh cache.
    /// Must outlive `session_lifetime` for an active session to keep
    /// rotating generation after generation.
    #[serde(with = "humantime_serde")]
    pub refresh_window: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            session_lifetime: Duration::from_secs(8 * 3600),
            anon_lifetime: Duration::from_secs(5),
            rotation_window: Duration::from_secs(10 * 60),
            refresh_window: Duration::from_secs(9 * 3600),
        }
    }
}

/// Admission limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max aggregate transaction size per submission, in bytes
    pub max_tx_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tx_size: 1_000_000,
        }
    }
}

/// Outcome polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Sleep between poll attempts
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Bounded wait performed by the submission handler (without `nowait`)
    pub send_wait_attempts: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            send_wait_attempts: 15,
        }
    }
}

/// Network identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Network identifier echoed to clients and mixed into login signatures
    pub network_id: i64,
    /// Ecosystem assumed for callers with no identity
    pub default_ecosystem: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            network_id: 1,
            default_ecosystem: "1".to_string(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid secret: {0}")]
    InvalidSecret(String),

    #[error("invalid auth settings: {0}")]
    InvalidAuth(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid status settings: {0}")]
    InvalidStatus(String),
}
