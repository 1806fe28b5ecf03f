use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::CoordinationStore;

/// Redis-backed coordination store. Holds a `ConnectionManager`, which
/// transparently reconnects, so callers don't need their own retry loop
/// around individual commands.
#[derive(Clone)]
pub struct RedisCoordinationStore {
    conn: ConnectionManager,
}

impl RedisCoordinationStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
    async fn acquire_lock(&self, key: &str, ttl_secs: u64) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }

    async fn release_lock(&self, key: &str) -> anyhow::Result<()> {
        self.del(key).await
    }

    async fn incr(&self, key: &str) -> anyhow::Result<u64> {
        let mut conn = self.conn.clone();
        let value: u64 = conn.incr(key, 1u64).await?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.expire(key, ttl_secs as i64).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let value: Option<u64> = conn.get(key).await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
