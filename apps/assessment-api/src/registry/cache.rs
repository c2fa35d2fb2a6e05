use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Storage for the registry service token.
pub trait ServiceTokenCache: Send + Sync {
    /// The cached token, if one is held and has not expired.
    fn get(&self) -> Option<String>;
    fn set(&self, token: String, ttl: Duration);
    fn clear(&self);
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Process-local token cache.
///
/// Uses `tokio::time::Instant` so tests can drive expiry with a paused clock.
pub struct MemoryTokenCache {
    entry: Mutex<Option<CachedToken>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }
}

impl Default for MemoryTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceTokenCache for MemoryTokenCache {
    fn get(&self) -> Option<String> {
        let entry = self.entry.lock();
        entry
            .as_ref()
            .filter(|cached| Instant::now() < cached.expires_at)
            .map(|cached| cached.token.clone())
    }

    fn set(&self, token: String, ttl: Duration) {
        *self.entry.lock() = Some(CachedToken {
            token,
            expires_at: Instant::now() + ttl,
        });
    }

    fn clear(&self) {
        *self.entry.lock() = None;
    }
}
