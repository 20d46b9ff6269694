//! # Session Module
//!
//! Best-effort session bookkeeping. Session records are auxiliary: a valid
//! token authenticates on its own, so every cache fault here degrades to a
//! logged [`CacheOutcome::Unavailable`] instead of an error.

pub mod memory;
pub mod redis_cache;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::UserType;

pub use memory::{DisabledSessionCache, InMemorySessionCache};
pub use redis_cache::RedisSessionCache;

#[derive(Debug, Error)]
pub enum SessionCacheError {
    #[error("session cache is not configured")]
    Disabled,

    #[error("error while connecting to session cache: {0}")]
    Connection(String),

    #[error("session cache operation timed out")]
    Timeout,

    #[error("session cache recently unreachable, skipping until the retry window passes")]
    Backoff,

    #[error("session cache command failed: {0}")]
    Command(String),
}

/// Raw key/value operations with expiry. Implementations report faults;
/// [`SessionStore`] decides they are not fatal.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionCacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, SessionCacheError>;

    /// Returns whether a key was removed.
    async fn delete(&self, key: &str) -> Result<bool, SessionCacheError>;

    /// Resets the TTL of an existing key. Returns `false` when the key is absent.
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, SessionCacheError>;

    fn backend(&self) -> &'static str;
}

/// Result of a session cache call as seen by the auth core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOutcome<T> {
    Available(T),
    Unavailable,
}

impl<T> CacheOutcome<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, CacheOutcome::Available(_))
    }
}

/// Cached record of one login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub token: String,
    pub login_time: DateTime<Utc>,
}

impl SessionRecord {
    pub fn cache_key(session_id: &str) -> String {
        format!("session:{session_id}")
    }
}

/// Degrade-on-error wrapper around a [`SessionCache`].
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn SessionCache>,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn SessionCache>) -> Self {
        Self { cache }
    }

    pub fn backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub async fn put(&self, record: &SessionRecord, ttl_secs: u64) -> CacheOutcome<()> {
        let value = match serde_json::to_string(record) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to encode session record: {}", e);
                return CacheOutcome::Unavailable;
            }
        };
        let key = SessionRecord::cache_key(&record.session_id);
        degrade("set", self.cache.set_ex(&key, &value, ttl_secs).await)
    }

    /// `Available(None)` means the cache answered and the session is gone.
    pub async fn fetch(&self, session_id: &str) -> CacheOutcome<Option<SessionRecord>> {
        let key = SessionRecord::cache_key(session_id);
        match degrade("get", self.cache.get(&key).await) {
            CacheOutcome::Available(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(record) => CacheOutcome::Available(Some(record)),
                Err(e) => {
                    tracing::warn!("Discarding undecodable session record {}: {}", key, e);
                    CacheOutcome::Available(None)
                }
            },
            CacheOutcome::Available(None) => CacheOutcome::Available(None),
            CacheOutcome::Unavailable => CacheOutcome::Unavailable,
        }
    }

    pub async fn remove(&self, session_id: &str) -> CacheOutcome<bool> {
        let key = SessionRecord::cache_key(session_id);
        degrade("delete", self.cache.delete(&key).await)
    }

    pub async fn touch(&self, session_id: &str, ttl_secs: u64) -> CacheOutcome<bool> {
        let key = SessionRecord::cache_key(session_id);
        degrade("expire", self.cache.expire(&key, ttl_secs).await)
    }
}

fn degrade<T>(operation: &str, result: Result<T, SessionCacheError>) -> CacheOutcome<T> {
    match result {
        Ok(value) => CacheOutcome::Available(value),
        Err(SessionCacheError::Disabled) => {
            tracing::debug!("Session cache disabled, skipping {} operation", operation);
            CacheOutcome::Unavailable
        }
        Err(e) => {
            tracing::warn!("Session cache {} operation failed: {}", operation, e);
            CacheOutcome::Unavailable
        }
    }
}
