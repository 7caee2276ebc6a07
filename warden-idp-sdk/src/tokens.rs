//! Machine-to-machine token caching.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Deserialize;

/// Seconds before expiry at which a cached token stops being served.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

/// Response from the client-credentials token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Single-slot read-through cache for the M2M access token.
///
/// Owned by the client that needs it rather than living in module-level
/// state, and tested with an injected `now`. Concurrent refreshes may race;
/// the slot is last-writer-wins, which is harmless because the token
/// endpoint simply issues a fresh token each time.
pub struct TokenCache {
    slot: RwLock<Option<CachedToken>>,
    buffer: Duration,
}

impl TokenCache {
    /// Create a cache with the default expiry buffer.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
            buffer: Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS),
        }
    }

    /// Create a cache with a custom expiry buffer in seconds.
    pub fn with_buffer_secs(buffer_secs: i64) -> Self {
        Self {
            slot: RwLock::new(None),
            buffer: Duration::seconds(buffer_secs),
        }
    }

    /// The cached token, if it is still valid at `now` (with buffer).
    pub fn get(&self, now: DateTime<Utc>) -> Option<String> {
        let slot = self.slot.read();
        let cached = slot.as_ref()?;
        if now + self.buffer < cached.expires_at {
            Some(cached.access_token.clone())
        } else {
            None
        }
    }

    /// Store a freshly issued token.
    pub fn store(&self, access_token: impl Into<String>, expires_in_secs: u64, now: DateTime<Utc>) {
        let cached = CachedToken {
            access_token: access_token.into(),
            expires_at: now + Duration::seconds(expires_in_secs as i64),
        };
        *self.slot.write() = Some(cached);
    }

    /// Drop the cached token (e.g. after a 401).
    pub fn clear(&self) {
        *self.slot.write() = None;
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache = TokenCache::new();
        assert_eq!(cache.get(at(0)), None);
    }

    #[test]
    fn test_fresh_token_hits() {
        let cache = TokenCache::new();
        cache.store("tok-1", 3600, at(0));
        assert_eq!(cache.get(at(0)).as_deref(), Some("tok-1"));
        assert_eq!(cache.get(at(3000)).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_token_expires_with_buffer() {
        let cache = TokenCache::new();
        cache.store("tok-1", 3600, at(0));

        // 3540s + 60s buffer reaches the expiry instant
        assert_eq!(cache.get(at(3540)), None);
        assert_eq!(cache.get(at(3600)), None);
        assert_eq!(cache.get(at(3539)).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_store_replaces_previous_token() {
        let cache = TokenCache::new();
        cache.store("tok-1", 3600, at(0));
        cache.store("tok-2", 3600, at(10));
        assert_eq!(cache.get(at(20)).as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_clear_drops_the_slot() {
        let cache = TokenCache::new();
        cache.store("tok-1", 3600, at(0));
        cache.clear();
        assert_eq!(cache.get(at(1)), None);
    }

    #[test]
    fn test_custom_buffer() {
        let cache = TokenCache::with_buffer_secs(0);
        cache.store("tok-1", 100, at(0));
        assert_eq!(cache.get(at(99)).as_deref(), Some("tok-1"));
        assert_eq!(cache.get(at(100)), None);
    }
}
