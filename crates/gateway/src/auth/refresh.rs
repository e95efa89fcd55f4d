//! Refresh cache: pending token rotations keyed by the original header.
//!
//! A single coarse reader/writer lock protects the map. The dataset is small
//! and entries are short-lived, so writer contention is acceptable; entries
//! are replaced whole under the exclusive lock, never mutated field-by-field,
//! so readers always observe a fully-formed entry.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A pending rotation: what is logically "behind" an original header now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshEntry {
    /// The replacement token
    pub token: String,
    /// Expiry of the replacement's claims
    pub expires_at: DateTime<Utc>,
    /// When the entry itself stops being resolvable
    pub refresh_expires_at: DateTime<Utc>,
}

/// Concurrent header -> rotation map with lazy expiry.
///
/// Explicitly constructed and injected (never process-global) so tests get
/// isolated instances and lifecycle stays visible.
#[derive(Debug, Default)]
pub struct RefreshCache {
    entries: RwLock<HashMap<String, RefreshEntry>>,
    populated: AtomicBool,
}

impl RefreshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry for a header, if any.
    ///
    /// An entry whose refresh window has closed behaves as absent even while
    /// physically present; nothing sweeps it. The atomic fast path skips the
    /// lock entirely until the first store ever happens.
    pub fn lookup(&self, header: &str, now: DateTime<Utc>) -> Option<RefreshEntry> {
        if !self.populated.load(Ordering::Acquire) {
            return None;
        }
        let entries = self.entries.read();
        entries
            .get(header)
            .filter(|entry| entry.refresh_expires_at > now)
            .cloned()
    }

    /// Insert or overwrite, unconditionally. Last writer wins; the invariant
    /// is at most one entry per header after concurrent stores settle.
    pub fn store(&self, header: impl Into<String>, entry: RefreshEntry) {
        let mut entries = self.entries.write();
        entries.insert(header.into(), entry);
        self.populated.store(true, Ordering::Release);
    }

    /// Remove a mapping immediately.
    ///
    /// Used when a cached replacement fails validation downstream, so a
    /// poisoned entry cannot trap the session in a rotation loop.
    pub fn delete(&self, header: &str) {
        let mut entries = self.entries.write();
        entries.remove(header);
    }

    /// Number of physically present entries (including lazily expired ones)
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no entry is physically present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
