//! Token data model: issued grants and their durable, serialized form.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Storage key for the persisted session record
pub const SESSION_STORAGE_KEY: &str = "botdeck.session";

/// Lead time before token expiry at which the proactive refresh fires.
/// 60s leaves room for a slow refresh round trip without serving a token
/// that the backend is about to reject.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(60);

/// One authentication grant issued by the auth backend.
/// Immutable once issued; superseded (never mutated) by the next refresh or login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds from issuance
    pub expires_in: u64,
}

/// Durable form of a grant, written to the credential store under a single key.
///
/// `expires_at` is epoch millis, computed at write time as now + `expires_in`.
/// A record with `expires_at <= now` at load time is invalid and must be
/// purged rather than loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokenRecord {
    pub tokens: TokenPair,
    pub expires_at: i64,
}

impl StoredTokenRecord {
    /// Build the durable record for a freshly issued pair.
    pub fn issue(tokens: TokenPair, now_millis: i64) -> Self {
        let expires_at = now_millis + (tokens.expires_in as i64) * 1000;
        Self { tokens, expires_at }
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at <= now_millis
    }

    /// Time until expiry, clamped at zero.
    pub fn remaining(&self, now_millis: i64) -> Duration {
        let millis = (self.expires_at - now_millis).max(0);
        Duration::from_millis(millis as u64)
    }

    /// Delay until the proactive refresh should fire, or `None` if the
    /// record is already inside the refresh buffer window (refresh should
    /// fire immediately rather than arming a zero/negative timer).
    pub fn refresh_delay(&self, now_millis: i64) -> Option<Duration> {
        let remaining = self.remaining(now_millis);
        if remaining <= REFRESH_BUFFER {
            None
        } else {
            Some(remaining - REFRESH_BUFFER)
        }
    }
}

/// Current wall-clock time as epoch millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
