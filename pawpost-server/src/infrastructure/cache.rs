//! Cache port used by the post service.
//!
//! Values are stored as JSON text under a [`CacheKey`] made of a cache name and
//! an argument. Cache failures never fail a request: the typed helpers below log
//! them and fall back to the source of truth.

use crate::domain::DomainError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub cache: &'static str,
    pub key: String,
}

impl CacheKey {
    pub fn new(cache: &'static str, key: impl ToString) -> Self {
        Self {
            cache,
            key: key.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.cache, self.key)
    }
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError>;
    async fn put(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), DomainError>;
    async fn evict(&self, key: &CacheKey) -> Result<(), DomainError>;
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &CacheKey) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("Dropping undecodable cache entry {}: {}", key, e);
                evict(cache, key).await;
                None
            }
        },
        Ok(None) => {
            tracing::debug!("Cache miss: {}", key);
            None
        }
        Err(e) => {
            tracing::warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

pub async fn put_json<T: Serialize>(cache: &dyn Cache, key: &CacheKey, value: &T, ttl: Duration) {
    let raw = match serde_json::to_string(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Cannot encode cache entry {}: {}", key, e);
            return;
        }
    };

    if let Err(e) = cache.put(key, raw, ttl).await {
        tracing::warn!("Cache write failed for {}: {}", key, e);
    }
}

pub async fn evict(cache: &dyn Cache, key: &CacheKey) {
    if let Err(e) = cache.evict(key).await {
        tracing::warn!("Cache eviction failed for {}: {}", key, e);
    }
}

/// Returns the cached value, or runs `populate` and caches its result.
pub async fn get_or_populate<T, F, Fut>(
    cache: &dyn Cache,
    key: &CacheKey,
    ttl: Duration,
    populate: F,
) -> Result<T, DomainError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    if let Some(value) = get_json(cache, key).await {
        return Ok(value);
    }

    let value = populate().await?;
    put_json(cache, key, &value, ttl).await;
    Ok(value)
}

/// Process-local cache with per-entry expiry. An expiry of `None` means the
/// TTL was too large to represent and the entry lives until evicted.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, (String, Option<Instant>)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at))
                    if expires_at.map_or(true, |at| at > Instant::now()) =>
                {
                    return Ok(Some(value.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // expired
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn put(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), DomainError> {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .write()
            .await
            .insert(key.clone(), (value, expires_at));
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> Result<(), DomainError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Redis-backed cache shared between server instances.
#[derive(Clone)]
pub struct RedisCache {
    conn: Arc<Mutex<ConnectionManager>>,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, DomainError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await.map_err(|e| {
            DomainError::CacheError(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!("Redis cache connected");
        Ok(Self {
            conn: Arc::new(Mutex::new(manager)),
        })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, DomainError> {
        let mut conn = self.conn.lock().await;
        let value: Option<String> = conn.get(key.to_string()).await?;
        Ok(value)
    }

    async fn put(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        conn.set_ex::<_, _, ()>(key.to_string(), value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn evict(&self, key: &CacheKey) -> Result<(), DomainError> {
        let mut conn = self.conn.lock().await;
        conn.del::<_, ()>(key.to_string()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        id: i64,
        title: String,
    }

    #[test]
    fn key_renders_cache_and_argument() {
        assert_eq!(CacheKey::new("posts", 42).to_string(), "posts::42");
    }

    #[actix_rt::test]
    async fn put_get_evict() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("posts", 1);

        cache
            .put(&key, "hello".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("hello"));

        cache.evict(&key).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[actix_rt::test]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("popular_posts", "list");

        cache
            .put(&key, "[]".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[actix_rt::test]
    async fn huge_ttl_keeps_entry() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("posts", 9);

        cache
            .put(&key, "kept".to_string(), Duration::MAX)
            .await
            .unwrap();

        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("kept"));
    }

    #[actix_rt::test]
    async fn populate_runs_only_on_miss() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("posts", 7);
        let ttl = Duration::from_secs(60);

        let first: Snapshot = get_or_populate(&cache, &key, ttl, || async {
            Ok::<_, DomainError>(Snapshot {
                id: 7,
                title: "fresh".to_string(),
            })
        })
        .await
        .unwrap();

        let second: Snapshot = get_or_populate(&cache, &key, ttl, || async {
            Err::<Snapshot, _>(DomainError::InternalError(
                "populate must not run".to_string(),
            ))
        })
        .await
        .unwrap();

        assert_eq!(first, second);
    }

    #[actix_rt::test]
    async fn undecodable_entry_is_dropped() {
        let cache = InMemoryCache::new();
        let key = CacheKey::new("posts", 3);
        cache
            .put(&key, "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let value: Option<Snapshot> = get_json(&cache, &key).await;
        assert!(value.is_none());
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }
}
