use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Key-value cache with expiring entries. The cache is an optimization:
/// callers must stay correct and available when it is down.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;
    async fn del(&self, key: &str) -> anyhow::Result<()>;
}

/// Where a list response was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Store,
}

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// In-process cache honoring TTLs. Used by `AppState::fake()` and tests.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().expect("cache lock");
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().expect("cache lock");
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().expect("cache lock");
        entries.remove(key);
        Ok(())
    }
}

/// Cache-aside read. Returns the cached list when present, fresh and
/// non-empty; otherwise runs `loader` and stores its result under `ttl`.
/// Cache failures (read, parse or write) are logged and treated as misses,
/// never surfaced to the caller. Empty lists are returned but not cached.
pub async fn read_through<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Duration,
    loader: F,
) -> anyhow::Result<(Vec<T>, Source)>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<T>>>,
{
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(rows) if !rows.is_empty() => {
                debug!(%key, "cache hit");
                return Ok((rows, Source::Cache));
            }
            Ok(_) => debug!(%key, "cached list empty, reloading"),
            Err(e) => warn!(%key, error = %e, "cached value unreadable, reloading"),
        },
        Ok(None) => debug!(%key, "cache miss"),
        Err(e) => warn!(%key, error = %e, "cache read failed, falling back to store"),
    }

    let rows = loader().await?;

    if !rows.is_empty() {
        match serde_json::to_string(&rows) {
            Ok(raw) => {
                if let Err(e) = cache.set_ex(key, &raw, ttl).await {
                    warn!(%key, error = %e, "cache store failed");
                }
            }
            Err(e) => warn!(%key, error = %e, "cache serialize failed"),
        }
    }

    Ok((rows, Source::Store))
}

/// Best-effort invalidation. Deleting a missing key is a no-op; a cache
/// failure is logged and swallowed.
pub async fn invalidate(cache: &dyn Cache, keys: &[&str]) {
    for key in keys {
        if let Err(e) = cache.del(key).await {
            warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("cache down")
        }
        async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> anyhow::Result<()> {
            anyhow::bail!("cache down")
        }
        async fn del(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("cache down")
        }
    }

    #[tokio::test]
    async fn miss_loads_and_stores() {
        let cache = MemoryCache::new();
        let (rows, source) = read_through(&cache, "k", Duration::from_secs(60), || async {
            Ok(vec!["a".to_string(), "b".to_string()])
        })
        .await
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(source, Source::Store);
        assert!(cache.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn hit_short_circuits_the_loader() {
        let cache = MemoryCache::new();
        cache
            .set_ex("k", r#"["cached"]"#, Duration::from_secs(60))
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let (rows, source) = read_through(&cache, "k", Duration::from_secs(60), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["fresh".to_string()])
        })
        .await
        .unwrap();
        assert_eq!(rows, vec!["cached".to_string()]);
        assert_eq!(source, Source::Cache);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_result_is_returned_but_not_cached() {
        let cache = MemoryCache::new();
        let (rows, source) = read_through::<String, _, _>(
            &cache,
            "k",
            Duration::from_secs(60),
            || async { Ok(vec![]) },
        )
        .await
        .unwrap();
        assert!(rows.is_empty());
        assert_eq!(source, Source::Store);
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_entry_is_treated_as_a_miss() {
        let cache = MemoryCache::new();
        cache
            .set_ex("k", "{not json", Duration::from_secs(60))
            .await
            .unwrap();
        let (rows, source) = read_through(&cache, "k", Duration::from_secs(60), || async {
            Ok(vec!["fresh".to_string()])
        })
        .await
        .unwrap();
        assert_eq!(rows, vec!["fresh".to_string()]);
        assert_eq!(source, Source::Store);
    }

    #[tokio::test]
    async fn broken_cache_falls_through_to_the_loader() {
        let (rows, source) = read_through(&BrokenCache, "k", Duration::from_secs(60), || async {
            Ok(vec![1, 2, 3])
        })
        .await
        .unwrap();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(source, Source::Store);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set_ex("k", r#"["v"]"#, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_keys_and_ignores_missing_ones() {
        let cache = MemoryCache::new();
        cache
            .set_ex("a", "[1]", Duration::from_secs(60))
            .await
            .unwrap();
        invalidate(&cache, &["a", "never-set"]).await;
        assert!(cache.get("a").await.unwrap().is_none());
        // broken cache: invalidate must not panic or propagate
        invalidate(&BrokenCache, &["a"]).await;
    }

    #[tokio::test]
    async fn write_then_read_reflects_the_write_after_invalidation() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);

        let (rows, _) =
            read_through(&cache, "k", ttl, || async { Ok(vec!["v1".to_string()]) })
                .await
                .unwrap();
        assert_eq!(rows, vec!["v1".to_string()]);

        // a mutation deletes the key, so the next read must load fresh data
        invalidate(&cache, &["k"]).await;
        let (rows, source) =
            read_through(&cache, "k", ttl, || async { Ok(vec!["v2".to_string()]) })
                .await
                .unwrap();
        assert_eq!(rows, vec!["v2".to_string()]);
        assert_eq!(source, Source::Store);
    }
}
