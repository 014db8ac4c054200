use std::time::Duration;

use async_trait::async_trait;

/// Optional second tier behind the in-process LRU — e.g. a shared cache
/// reachable over the network. The core ships no concrete implementation;
/// callers bring their own.
#[async_trait]
pub trait SharedBackend: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
}

/// The default "no shared backend" implementation: every call misses. Used
/// when `CacheTier` is constructed without a shared backend so the code path
/// stays uniform.
pub struct NoSharedBackend;

#[async_trait]
impl SharedBackend for NoSharedBackend {
    async fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}
}
