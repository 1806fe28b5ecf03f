pub mod redis_store;

pub use redis_store::RedisCoordinationStore;

use async_trait::async_trait;

/// Cluster-wide coordination primitives: leased locks and counters with
/// TTL. Backed by Redis in production; a trait so tests can substitute an
/// in-memory double.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// `SET key value EX ttl_secs NX` — true if the lock was acquired.
    async fn acquire_lock(&self, key: &str, ttl_secs: u64) -> anyhow::Result<bool>;

    /// `DEL key`.
    async fn release_lock(&self, key: &str) -> anyhow::Result<()>;

    /// `INCR key`.
    async fn incr(&self, key: &str) -> anyhow::Result<u64>;

    /// `EXPIRE key ttl_secs`.
    async fn expire(&self, key: &str, ttl_secs: u64) -> anyhow::Result<()>;

    /// `GET key`, parsed as an integer counter.
    async fn get(&self, key: &str) -> anyhow::Result<Option<u64>>;

    /// `DEL key`.
    async fn del(&self, key: &str) -> anyhow::Result<()>;
}
