//! Process-local session cache backends.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{SessionCache, SessionCacheError};

/// DashMap-backed cache with per-entry expiry. Expired entries are dropped lazily.
#[derive(Default)]
pub struct InMemorySessionCache {
    entries: DashMap<String, (String, Instant)>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn deadline(ttl_secs: u64) -> Instant {
        // A zero TTL would expire immediately.
        Instant::now() + Duration::from_secs(ttl_secs.max(1))
    }

    fn live(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .remove_if(key, |_, (_, expires_at)| *expires_at <= now);
        self.entries.contains_key(key)
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionCacheError> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Self::deadline(ttl_secs)));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionCacheError> {
        if !self.live(key) {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value().0.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, SessionCacheError> {
        let was_live = self.live(key);
        Ok(self.entries.remove(key).is_some() && was_live)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, SessionCacheError> {
        if !self.live(key) {
            return Ok(false);
        }
        Ok(match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.value_mut().1 = Self::deadline(ttl_secs);
                true
            }
            None => false,
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Used when no cache URL is configured: every call reports `Disabled`.
pub struct DisabledSessionCache;

#[async_trait]
impl SessionCache for DisabledSessionCache {
    async fn set_ex(&self, _: &str, _: &str, _: u64) -> Result<(), SessionCacheError> {
        Err(SessionCacheError::Disabled)
    }

    async fn get(&self, _: &str) -> Result<Option<String>, SessionCacheError> {
        Err(SessionCacheError::Disabled)
    }

    async fn delete(&self, _: &str) -> Result<bool, SessionCacheError> {
        Err(SessionCacheError::Disabled)
    }

    async fn expire(&self, _: &str, _: u64) -> Result<bool, SessionCacheError> {
        Err(SessionCacheError::Disabled)
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}
