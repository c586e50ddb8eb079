//! Redis-backed key-value store

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::KvStore;

/// Network-attached store for multi-node deployments. Values are stored as
/// JSON strings with `SET .. EX`, so TTL handling lives in Redis itself.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("failed to create Redis client")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;

        info!("connected to Redis session store");
        Ok(Self { conn })
    }

    /// Liveness probe for the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .context("Redis PING failed")?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.context("Redis GET failed")?;

        match raw {
            Some(raw) => {
                let value = serde_json::from_str(&raw).context("stored value is not JSON")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let raw = serde_json::to_string(&value)?;
        let ttl_secs = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, raw, ttl_secs)
            .await
            .context("Redis SET EX failed")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.context("Redis DEL failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    #[ignore] // Requires a running Redis at REDIS_URL.
    async fn live_roundtrip() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let store = RedisStore::connect(&url).await.unwrap();

        store
            .set("wander:test:key", json!({"ok": true}), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(
            store.get("wander:test:key").await.unwrap(),
            Some(json!({"ok": true}))
        );

        store.delete("wander:test:key").await.unwrap();
        assert_eq!(store.get("wander:test:key").await.unwrap(), None);
    }
}
