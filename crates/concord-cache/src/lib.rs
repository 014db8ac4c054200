//! Two-tier keyed cache: an in-process LRU backed optionally by a shared
//! backend. Values are opaque bytes; callers own the encoding.

mod hash;
mod shared;
mod tier;

pub use hash::stable_hash;
pub use shared::{NoSharedBackend, SharedBackend};
pub use tier::{CacheConfig, CacheTier};
