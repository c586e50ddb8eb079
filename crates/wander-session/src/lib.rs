//! wander-session - Keyed, time-bounded storage
//!
//! One narrow `KvStore` interface with two implementations:
//! - `MemoryStore`: process-local map with monotonic expiry, for tests and
//!   single-instance deployments
//! - `RedisStore`: network-attached store for production
//!
//! `ResultStore` layers result-set and conversation keys on top;
//! `SearchCache` is a separate wrapper for whole-response caching so the
//! session store is not conflated with a generic app cache.

pub mod memory;
pub mod redis_store;
pub mod result_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use result_store::{generate_cache_key, ResultStore, SearchCache};

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Key-value store with per-entry TTL. Writes are idempotent replacements;
/// a successful read within TTL returns exactly the value written.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}
