//! Two-tier cache with Moka (L1) and optional Redis (L2).
//!
//! Used for per-page content dictionaries. Entries are best effort: a
//! failed Redis call degrades to a miss, never to an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use tracing::{debug, warn};

/// Default TTL for L1 cache (60 seconds).
const L1_TTL_SECS: u64 = 60;

/// Default TTL for L2 cache (5 minutes).
const L2_TTL_SECS: u64 = 300;

/// Maximum L1 cache capacity.
const L1_MAX_CAPACITY: u64 = 10_000;

/// Shared string cache consulted by the content store.
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Get a value, `None` on miss.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value.
    async fn set(&self, key: &str, value: &str);

    /// Drop a value.
    async fn invalidate(&self, key: &str);
}

/// Two-tier cache layer.
///
/// L1 (Moka): In-process, short TTL, per-instance
/// L2 (Redis): Shared across instances, longer TTL
#[derive(Clone)]
pub struct CacheLayer {
    inner: Arc<CacheLayerInner>,
}

struct CacheLayerInner {
    /// L1 in-process cache.
    local: Cache<String, String>,

    /// L2 Redis client, absent for single-instance deployments.
    redis: Option<RedisClient>,
}

impl CacheLayer {
    /// Create a new cache layer.
    pub fn new(redis: Option<RedisClient>) -> Self {
        let local = Cache::builder()
            .max_capacity(L1_MAX_CAPACITY)
            .time_to_live(Duration::from_secs(L1_TTL_SECS))
            .build();

        Self {
            inner: Arc::new(CacheLayerInner { local, redis }),
        }
    }

    /// Create an in-process only cache layer.
    pub fn local_only() -> Self {
        Self::new(None)
    }

    async fn redis_connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let redis = self.inner.redis.as_ref()?;
        match redis.get_multiplexed_async_connection().await {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "failed to get Redis connection for cache");
                None
            }
        }
    }

    /// Check that the L2 tier answers. Always true without Redis.
    pub async fn healthy(&self) -> bool {
        if self.inner.redis.is_none() {
            return true;
        }
        let Some(mut conn) = self.redis_connection().await else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }

    /// Get cache statistics (for monitoring).
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_entry_count: self.inner.local.entry_count(),
        }
    }
}

#[async_trait]
impl ContentCache for CacheLayer {
    /// Checks L1 first, then L2. On L2 hit, populates L1.
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(val) = self.inner.local.get(key).await {
            debug!(key = %key, "cache L1 hit");
            return Some(val);
        }

        let mut conn = self.redis_connection().await?;
        let val: Option<String> = conn.get(key).await.ok()?;

        if let Some(ref v) = val {
            debug!(key = %key, "cache L2 hit, populating L1");
            self.inner.local.insert(key.to_string(), v.clone()).await;
        }

        val
    }

    /// Writes to both L1 and L2.
    async fn set(&self, key: &str, value: &str) {
        self.inner
            .local
            .insert(key.to_string(), value.to_string())
            .await;

        let Some(mut conn) = self.redis_connection().await else {
            debug!(key = %key, "cache set (L1 only)");
            return;
        };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, L2_TTL_SECS).await {
            warn!(error = %e, key = %key, "failed to set cache value in Redis");
            return;
        }

        debug!(key = %key, ttl = %L2_TTL_SECS, "cache set");
    }

    async fn invalidate(&self, key: &str) {
        self.inner.local.invalidate(key).await;

        let Some(mut conn) = self.redis_connection().await else {
            return;
        };

        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(error = %e, key = %key, "failed to delete cache key from Redis");
        }

        debug!(key = %key, "cache invalidated");
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries in L1 cache.
    pub l1_entry_count: u64,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("redis", &self.inner.redis.is_some())
            .finish()
    }
}
