//! Signed session-token encoding and validation.
//!
//! Stateless HS256 over [`SessionClaims`]. The algorithm is pinned to the
//! HMAC family on both mint and verify; a token whose header names anything
//! else is rejected before signature checking (algorithm-confusion defence).

use crate::domain::claims::SessionClaims;
use crate::domain::error::{GatewayError, GatewayResult};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;

/// Bearer scheme prefix expected on the Authorization header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Stateless token codec bound to one process-local secret
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Create a codec from raw secret bytes
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Create a codec from an optional hex-encoded secret.
    ///
    /// With no configured secret a random one is drawn, so a restart
    /// invalidates all outstanding tokens.
    pub fn from_config(secret: Option<&str>) -> GatewayResult<Self> {
        let bytes = match secret {
            Some(hex_secret) => hex::decode(hex_secret)
                .map_err(|e| GatewayError::Config(format!("token secret is not hex: {}", e)))?,
            None => rand::thread_rng().gen::<[u8; 32]>().to_vec(),
        };
        Ok(Self::new(&bytes))
    }

    /// Sign a claim set
    pub fn encode(&self, claims: &SessionClaims) -> GatewayResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| GatewayError::Internal(format!("token encoding failed: {}", e)))
    }

    /// Verify a token's signature and return its claims.
    ///
    /// Fails with [`GatewayError::Signature`] on a non-HMAC algorithm or a
    /// bad signature. Expiry is *not* checked here: the session layer
    /// inspects `exp` against its injected clock, and rotation deliberately
    /// accepts an expired-but-well-signed cached replacement.
    pub fn decode(&self, token: &str) -> GatewayResult<SessionClaims> {
        let header = decode_header(token)
            .map_err(|e| GatewayError::Signature(format!("malformed token header: {}", e)))?;

        if !matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(GatewayError::Signature(format!(
                "unexpected signing algorithm: {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| GatewayError::Signature(e.to_string()))
    }

    /// Strip the bearer prefix from an Authorization header value.
    ///
    /// An empty header is not an error; it means "no identity" and is
    /// reported as `None`.
    pub fn strip_bearer(header: &str) -> GatewayResult<Option<&str>> {
        if header.is_empty() {
            return Ok(None);
        }
        header
            .strip_prefix(BEARER_PREFIX)
            .map(Some)
            .ok_or(GatewayError::AuthFormat)
    }
}
