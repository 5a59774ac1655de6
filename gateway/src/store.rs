// SPDX-License-Identifier: Apache-2.0 OR MIT
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

//
// ─── GENERIC CACHE STORE TRAIT ──────────────────────────────────────
//
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Atomically store `value` under `key` with the given expiry.
    /// An existing entry for `key` is replaced outright; last write wins.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Fetch a live entry. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

//
// ─── IN-MEMORY BACKEND ───────────────────────────────────────────────
//
#[derive(Default)]
pub struct InMemoryStore {
    map: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl InMemoryStore {
    /// Value and remaining lifetime of a live entry. Test-facing; the
    /// request path only ever writes.
    pub async fn entry(&self, key: &str) -> Option<(String, Duration)> {
        let map = self.map.read().await;
        let now = Instant::now();
        map.get(key).and_then(|(value, exp)| {
            if *exp > now {
                Some((value.clone(), *exp - now))
            } else {
                None
            }
        })
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut map = self.map.write().await;
        let now = Instant::now();

        // purge expired
        map.retain(|_, &mut (_, exp)| exp > now);

        // TTLs beyond what Instant can represent are effectively permanent
        let exp = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(86400 * 365 * 100));
        map.insert(key.to_owned(), (value.to_owned(), exp));
        debug!(%key, ttl = ?ttl, "cached batch (in-memory)");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entry(key).await.map(|(value, _)| value))
    }
}

//
// ─── REDIS BACKEND ──────────────────────────────────────────────────
//
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(url: &str) -> Result<Self> {
        let client =
            redis::Client::open(url).with_context(|| format!("connect redis @ {}", url))?;
        Ok(Self { client })
    }

    async fn get_conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        let mut backoff_ms = 200u64;
        for attempt in 1..=3 {
            match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt < 3 => {
                    warn!(
                        attempt,
                        "redis connect failed: {e}; retrying in {backoff_ms}ms"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!()
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        // SETEX: replace-with-expiry in one round trip
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.get_conn().await?;
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .context("redis SETEX")?;
        info!(%key, ttl = %ttl_secs, "cached batch (redis)");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_conn().await?;
        let v: Option<String> = conn.get(key).await.context("redis GET")?;
        Ok(v)
    }
}

//
// ─── FACTORY FUNCTION ────────────────────────────────────────────────
//
pub enum StoreBackend {
    InMemory,
    Redis(String),
}

impl StoreBackend {
    pub fn build(self) -> Result<Arc<dyn CacheStore>> {
        match self {
            StoreBackend::InMemory => {
                info!("using InMemory cache store");
                Ok(Arc::new(InMemoryStore::default()))
            }
            StoreBackend::Redis(url) => {
                info!(%url, "using Redis cache store");
                Ok(Arc::new(RedisStore::new(&url)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryStore::default();
        store
            .set_with_ttl("orig:1:dest:2", "tok-a\ntok-b", Duration::from_secs(60))
            .await
            .unwrap();

        let got = store.get("orig:1:dest:2").await.unwrap();
        assert_eq!(got.as_deref(), Some("tok-a\ntok-b"));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = InMemoryStore::default();
        store
            .set_with_ttl("k", "v", Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rewrite_replaces_value_and_ttl() {
        let store = InMemoryStore::default();
        store
            .set_with_ttl("k", "old", Duration::from_secs(10))
            .await
            .unwrap();
        store
            .set_with_ttl("k", "new", Duration::from_secs(60))
            .await
            .unwrap();

        let (value, remaining) = store.entry("k").await.unwrap();
        assert_eq!(value, "new");
        assert!(remaining > Duration::from_secs(10));
    }
}
