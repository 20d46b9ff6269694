//! Redis-backed session cache.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{SessionCache, SessionCacheError};

/// How long calls fail fast after the server stopped answering.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Default)]
struct ConnectionState {
    connection: Option<MultiplexedConnection>,
    retry_after: Option<Instant>,
}

pub struct RedisSessionCache {
    client: Client,
    /// Only held to read or swap the connection, never across network I/O.
    state: Mutex<ConnectionState>,
    /// Upper bound on a whole call, connecting included.
    timeout: Duration,
}

impl RedisSessionCache {
    /// Builds the client without connecting, so a down cache cannot block startup.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, SessionCacheError> {
        let client = Client::open(url).map_err(|e| SessionCacheError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            state: Mutex::new(ConnectionState::default()),
            timeout,
        })
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection, SessionCacheError> {
        {
            let state = self.state.lock().await;
            if let Some(conn) = &state.connection {
                return Ok(conn.clone());
            }
            if state.retry_after.is_some_and(|at| Instant::now() < at) {
                return Err(SessionCacheError::Backoff);
            }
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SessionCacheError::Connection(e.to_string()))?;

        let mut state = self.state.lock().await;
        state.retry_after = None;
        if let Some(existing) = &state.connection {
            return Ok(existing.clone());
        }
        tracing::info!("✅ Connected to Redis session cache");
        state.connection = Some(conn.clone());
        Ok(conn)
    }

    async fn run<T, F, Fut>(&self, op: F) -> Result<T, SessionCacheError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let call = async {
            let conn = self.get_connection().await?;
            op(conn).await.map_err(|e| {
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    SessionCacheError::Connection(e.to_string())
                } else {
                    SessionCacheError::Command(e.to_string())
                }
            })
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Err(SessionCacheError::Connection(e))) => {
                self.mark_unreachable().await;
                Err(SessionCacheError::Connection(e))
            }
            Ok(result) => result,
            Err(_) => {
                self.mark_unreachable().await;
                Err(SessionCacheError::Timeout)
            }
        }
    }

    async fn mark_unreachable(&self) {
        let mut state = self.state.lock().await;
        state.connection = None;
        let retry_after = Instant::now() + RECONNECT_BACKOFF;
        if state.retry_after.is_none_or(|at| at < retry_after) {
            state.retry_after = Some(retry_after);
        }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), SessionCacheError> {
        // A zero TTL is rejected by SETEX.
        let ttl_secs = ttl_secs.max(1);
        self.run(|mut conn| async move { conn.set_ex::<_, _, ()>(key, value, ttl_secs).await })
            .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, SessionCacheError> {
        self.run(|mut conn| async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, SessionCacheError> {
        let deleted: i64 = self
            .run(|mut conn| async move { conn.del(key).await })
            .await?;
        Ok(deleted > 0)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, SessionCacheError> {
        let seconds = i64::try_from(ttl_secs.max(1)).unwrap_or(i64::MAX);
        self.run(|mut conn| async move { conn.expire::<_, bool>(key, seconds).await })
            .await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::silent_redis_url;
    use std::sync::Arc;

    #[test]
    fn rejects_unusable_urls() {
        assert!(RedisSessionCache::new("not a url", Duration::from_millis(50)).is_err());
        assert!(
            RedisSessionCache::new("redis://127.0.0.1:6379/0", Duration::from_millis(50)).is_ok()
        );
    }

    #[tokio::test]
    async fn unreachable_server_fails_fast() {
        // Port 9 (discard) on loopback refuses connections on test hosts.
        let cache =
            RedisSessionCache::new("redis://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        let started = std::time::Instant::now();

        let result = cache.get("session:anything").await;

        assert!(matches!(
            result,
            Err(SessionCacheError::Connection(_)) | Err(SessionCacheError::Timeout)
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(cache.backend(), "redis");
    }

    #[tokio::test]
    async fn concurrent_calls_to_a_hung_server_share_one_bound() {
        let timeout = Duration::from_millis(300);
        let cache = Arc::new(RedisSessionCache::new(&silent_redis_url().await, timeout).unwrap());

        let started = std::time::Instant::now();
        let mut calls = tokio::task::JoinSet::new();
        for i in 0..6 {
            let cache = cache.clone();
            calls.spawn(async move {
                let started = std::time::Instant::now();
                let result = cache.get(&format!("session:{i}")).await;
                (result, started.elapsed())
            });
        }

        while let Some(joined) = calls.join_next().await {
            let (result, elapsed) = joined.unwrap();
            assert!(result.is_err());
            assert!(elapsed < timeout * 3, "call took {elapsed:?}");
        }
        assert!(started.elapsed() < timeout * 3, "total {:?}", started.elapsed());

        // Within the retry window calls skip the network entirely.
        let started = std::time::Instant::now();
        assert!(matches!(
            cache.set_ex("session:late", "{}", 60).await,
            Err(SessionCacheError::Backoff)
        ));
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
