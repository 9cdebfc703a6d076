//! Key-value tier
//!
//! The access engine only needs three primitives from the fast store:
//! - `get` distinguishing "absent" from a failed lookup
//! - `set` with an optional TTL
//! - `set_if_absent`, a single atomic conditional write (SET NX) that the
//!   replay guard depends on

mod error;
mod keys;
mod memory;
mod redis_store;

pub use error::{CacheError, CacheResult};
pub use keys::CacheKey;
pub use memory::MemoryKeyValueStore;
pub use redis_store::RedisKeyValueStore;

use std::time::Duration;

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `Ok(None)` means the key is absent
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Write `value`; `ttl = None` keeps the key until the store evicts it
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// Write `value` only if `key` does not exist. Returns `true` when this
    /// call created the key.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool>;

    /// Liveness probe for readiness checks
    async fn ping(&self) -> CacheResult<()>;
}
