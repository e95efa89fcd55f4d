//! Session establishment and transparent token rotation.
//!
//! A client keeps presenting the same `Authorization` header for the life of
//! its session; rotation only changes what is logically behind that header,
//! which is exactly what the refresh cache maps. Within one session, a
//! rotation performed by one request is visible to the next request bearing
//! the same header; the cache is the single source of truth.

use crate::auth::codec::TokenCodec;
use crate::auth::refresh::{RefreshCache, RefreshEntry};
use crate::domain::claims::{Identity, SessionClaims};
use crate::domain::config::AuthConfig;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::ports::outbound::TimeSource;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A freshly minted token together with its claims
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

impl IssuedToken {
    /// Expiry of the token's claims
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_default()
    }
}

/// The effective token behind a presented header after rotation
#[derive(Debug, Clone)]
pub struct RotatedToken {
    pub token: String,
    pub claims: SessionClaims,
}

/// Issues tokens, validates them per request, and rotates near-expiry tokens
/// through the refresh cache.
pub struct AuthSession {
    codec: TokenCodec,
    cache: Arc<RefreshCache>,
    time: Arc<dyn TimeSource>,
    session_lifetime: Duration,
    anon_lifetime: Duration,
    rotation_window: Duration,
    refresh_window: Duration,
    default_ecosystem: String,
}

impl AuthSession {
    pub fn new(
        codec: TokenCodec,
        cache: Arc<RefreshCache>,
        time: Arc<dyn TimeSource>,
        config: &AuthConfig,
        default_ecosystem: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            cache,
            time,
            session_lifetime: Duration::from_std(config.session_lifetime)
                .unwrap_or_else(|_| Duration::hours(8)),
            anon_lifetime: Duration::from_std(config.anon_lifetime)
                .unwrap_or_else(|_| Duration::seconds(5)),
            rotation_window: Duration::from_std(config.rotation_window)
                .unwrap_or_else(|_| Duration::minutes(10)),
            refresh_window: Duration::from_std(config.refresh_window)
                .unwrap_or_else(|_| Duration::hours(9)),
            default_ecosystem: default_ecosystem.into(),
        }
    }

    /// Mint a short-lived anonymous token to bootstrap the login handshake.
    ///
    /// The embedded UID is the server-chosen nonce the client signs with its
    /// private key to prove key ownership.
    pub fn issue_anonymous(&self) -> GatewayResult<IssuedToken> {
        let now = self.time.now();
        let claims = SessionClaims {
            uid: Uuid::now_v7().to_string(),
            ecosystem_id: self.default_ecosystem.clone(),
            key_id: String::new(),
            account_id: String::new(),
            role_id: String::new(),
            is_mobile: false,
            exp: (now + self.anon_lifetime).timestamp(),
        };
        let token = self.codec.encode(&claims)?;
        debug!(uid = %claims.uid, "issued anonymous session token");
        Ok(IssuedToken { token, claims })
    }

    /// Mint a full-identity token with the long session lifetime.
    pub fn issue_authenticated(&self, mut claims: SessionClaims) -> GatewayResult<IssuedToken> {
        let now = self.time.now();
        claims.exp = (now + self.session_lifetime).timestamp();
        let token = self.codec.encode(&claims)?;
        debug!(
            key_id = %claims.key_id,
            ecosystem_id = %claims.ecosystem_id,
            "issued authenticated session token"
        );
        Ok(IssuedToken { token, claims })
    }

    /// Establish the caller's identity from a bearer header, without
    /// touching the rotation machinery.
    ///
    /// An empty header is no identity, not a failure: the caller becomes an
    /// anonymous client of the default ecosystem.
    pub fn validate(&self, bearer_header: &str) -> GatewayResult<Identity> {
        match TokenCodec::strip_bearer(bearer_header)? {
            None => Ok(Identity::Anonymous {
                ecosystem_id: self.default_ecosystem.clone(),
            }),
            Some(token) => {
                let claims = self.decode_live(token)?;
                Ok(Identity::Authenticated(claims))
            }
        }
    }

    /// Decode a token and enforce its expiry against the injected clock.
    fn decode_live(&self, token: &str) -> GatewayResult<SessionClaims> {
        let claims = self.codec.decode(token)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_default();
        if expires_at <= self.time.now() {
            return Err(GatewayError::Signature("token expired".into()));
        }
        Ok(claims)
    }

    /// Resolve the effective token behind a presented header, rotating when
    /// the session is near expiry.
    ///
    /// Cache hit: the cached replacement carries the session. A replacement
    /// itself near expiry gets a second-generation replacement, stored under
    /// the *original* header so the client-presented key keeps resolving.
    /// A replacement that no longer validates is deleted (poisoned entry)
    /// and the original header gets plain validation instead.
    ///
    /// Cache miss: plain validation of the original token; a near-expiry
    /// original mints the first-generation replacement.
    pub fn rotate(&self, bearer_header: &str) -> GatewayResult<RotatedToken> {
        let now = self.time.now();

        if let Some(entry) = self.cache.lookup(bearer_header, now) {
            // Signature check only: a replacement past its own expiry is
            // still the session's continuation and gets re-minted below.
            match self.codec.decode(&entry.token) {
                Ok(claims) => {
                    if now + self.rotation_window > entry.expires_at {
                        return self.mint_replacement(bearer_header, claims, now);
                    }
                    return Ok(RotatedToken {
                        token: entry.token,
                        claims,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "cached replacement failed validation, dropping entry");
                    self.cache.delete(bearer_header);
                }
            }
        }

        let token = TokenCodec::strip_bearer(bearer_header)?.ok_or(GatewayError::AuthFormat)?;
        let claims = self.decode_live(token)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_default();
        // Anonymous bootstrap tokens are one-shot and never rotated; only a
        // key-bound session is worth extending.
        if claims.is_logged_in() && now + self.rotation_window > expires_at {
            return self.mint_replacement(bearer_header, claims, now);
        }
        Ok(RotatedToken {
            token: token.to_string(),
            claims,
        })
    }

    fn mint_replacement(
        &self,
        bearer_header: &str,
        claims: SessionClaims,
        now: DateTime<Utc>,
    ) -> GatewayResult<RotatedToken> {
        // A new claims value every time; claims are never mutated in place.
        let replacement = SessionClaims {
            exp: (now + self.session_lifetime).timestamp(),
            ..claims
        };
        let token = self.codec.encode(&replacement)?;
        self.cache.store(
            bearer_header,
            RefreshEntry {
                token: token.clone(),
                expires_at: DateTime::from_timestamp(replacement.exp, 0).unwrap_or_default(),
                refresh_expires_at: now + self.refresh_window,
            },
        );
        debug!(uid = %replacement.uid, key_id = %replacement.key_id, "rotated session token");
        Ok(RotatedToken {
            token,
            claims: replacement,
        })
    }

    /// Remaining lifetime of a claim set, clamped at zero
    pub fn remaining(&self, claims: &SessionClaims) -> chrono::Duration {
        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or_default();
        (expires_at - self.time.now()).max(chrono::Duration::zero())
    }
}
