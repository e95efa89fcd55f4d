//! Session identity: token claims and the per-request identity value.

use crate::domain::types::KeyId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity asserted by a session token.
///
/// Immutable once issued; rotation always constructs a new value. Identity
/// fields are empty strings for anonymous (pre-login) sessions, matching the
/// compact claim sets the token codec emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session UID, the login-handshake nonce (UUID v7)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Ecosystem the session operates in
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ecosystem_id: String,
    /// Submitting key identifier (decimal)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key_id: String,
    /// Grouped-decimal account address derived from the key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_id: String,
    /// Role the session acts under
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_id: String,
    /// Mobile client flag
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_mobile: bool,
    /// Standard expiry, Unix seconds
    pub exp: i64,
}

impl SessionClaims {
    /// Parsed key id, when the session is bound to a key
    pub fn key_id(&self) -> Option<KeyId> {
        self.key_id.parse().ok()
    }

    /// True once the session is bound to a key (post-login)
    pub fn is_logged_in(&self) -> bool {
        !self.key_id.is_empty()
    }
}

/// Caller identity established for one request.
///
/// "No identity" is a first-class case: an absent bearer header maps to
/// `Anonymous` with the default ecosystem rather than an error. Write
/// operations that need a key fail at the authorization seam, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No token presented
    Anonymous { ecosystem_id: String },
    /// Valid token presented (may still be a pre-login session)
    Authenticated(SessionClaims),
}

impl Identity {
    /// Ecosystem the request operates in
    pub fn ecosystem_id(&self) -> &str {
        match self {
            Identity::Anonymous { ecosystem_id } => ecosystem_id,
            Identity::Authenticated(claims) => &claims.ecosystem_id,
        }
    }

    /// Key id, when logged in
    pub fn key_id(&self) -> Option<KeyId> {
        match self {
            Identity::Anonymous { .. } => None,
            Identity::Authenticated(claims) => claims.key_id(),
        }
    }

    /// Claims behind the identity, if a token was presented
    pub fn claims(&self) -> Option<&SessionClaims> {
        match self {
            Identity::Anonymous { .. } => None,
            Identity::Authenticated(claims) => Some(claims),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Anonymous { ecosystem_id } => {
                write!(f, "anonymous@{}", ecosystem_id)
            }
            Identity::Authenticated(claims) if claims.is_logged_in() => {
                write!(f, "key:{}@{}", claims.key_id, claims.ecosystem_id)
            }
            Identity::Authenticated(claims) => write!(f, "session:{}", claims.uid),
        }
    }
}

/// Format a key id as the grouped-decimal account address
/// (`xxxx-xxxx-xxxx-xxxx-xxxx`).
pub fn account_address(key_id: KeyId) -> String {
    let digits = format!("{:020}", key_id as u64);
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("-")
}
