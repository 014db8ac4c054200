use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

use crate::shared::{NoSharedBackend, SharedBackend};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub local_size: usize,
    pub default_ttl: Duration,
    /// Writes to the shared backend are abandoned (but still committed
    /// locally) if they take longer than this.
    pub write_budget: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_size: 10_000,
            default_ttl: Duration::from_secs(3600),
            write_budget: Duration::from_millis(50),
        }
    }
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Keyed get/set with TTL across an in-process LRU and an optional shared
/// backend. `get` checks local first, then shared (populating local on a
/// shared hit); `set` writes to both, budgeting the shared write to
/// `config.write_budget` so a slow shared backend never stalls the request
/// path — if the budget is exceeded the entry is still committed locally.
pub struct CacheTier {
    config: CacheConfig,
    local: Mutex<LruCache<String, Entry>>,
    shared: Arc<dyn SharedBackend>,
}

impl CacheTier {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_shared_backend(config, Arc::new(NoSharedBackend))
    }

    pub fn with_shared_backend(config: CacheConfig, shared: Arc<dyn SharedBackend>) -> Self {
        let cap = NonZeroUsize::new(config.local_size.max(1)).unwrap();
        Self {
            config,
            local: Mutex::new(LruCache::new(cap)),
            shared,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        {
            let mut local = self.local.lock().await;
            if let Some(entry) = local.get(key) {
                if entry.expires_at > Instant::now() {
                    return Some(entry.value.clone());
                }
                local.pop(key);
            }
        }

        if let Some(value) = self.shared.get(key).await {
            let mut local = self.local.lock().await;
            local.put(
                key.to_string(),
                Entry {
                    value: value.clone(),
                    expires_at: Instant::now() + self.config.default_ttl,
                },
            );
            return Some(value);
        }

        None
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        {
            let mut local = self.local.lock().await;
            local.put(
                key.to_string(),
                Entry {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }

        let shared = self.shared.clone();
        let key = key.to_string();
        let write = shared.set(&key, value, ttl);
        if tokio::time::timeout(self.config.write_budget, write)
            .await
            .is_err()
        {
            tracing::warn!(key, "shared cache write exceeded budget, kept local only");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn set_then_get_hits_within_ttl() {
        let cache = CacheTier::new(CacheConfig::default());
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = CacheTier::new(CacheConfig::default());
        cache
            .set("k", b"v".to_vec(), Duration::from_millis(5))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, None);
    }

    struct CountingShared {
        hits: AtomicUsize,
        store: Mutex<std::collections::HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl SharedBackend for CountingShared {
        async fn get(&self, key: &str) -> Option<Vec<u8>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.store.lock().await.get(key).cloned()
        }

        async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) {
            self.store.lock().await.insert(key.to_string(), value);
        }
    }

    #[tokio::test]
    async fn shared_hit_populates_local() {
        let shared = Arc::new(CountingShared {
            hits: AtomicUsize::new(0),
            store: Mutex::new(std::collections::HashMap::new()),
        });
        shared
            .store
            .lock()
            .await
            .insert("k".to_string(), b"from-shared".to_vec());

        let cache = CacheTier::with_shared_backend(CacheConfig::default(), shared.clone());
        assert_eq!(cache.get("k").await, Some(b"from-shared".to_vec()));
        assert_eq!(cache.get("k").await, Some(b"from-shared".to_vec()));
        // Second get is served from local, not shared.
        assert_eq!(shared.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let cache = CacheTier::new(CacheConfig::default());
        assert_eq!(cache.get("nope").await, None);
    }
}
