//! Reliable delayed queue atop Redis: a ready list consumed with a blocking
//! pop, a delayed sorted set keyed by due-at epoch millis, and a
//! per-consumer processing list for late-ack/redelivery. Grounded on the
//! `PostgresJobQueue` enqueue/claim shape (generalized to a broker-agnostic
//! transport) and on `celery.py`, which confirms Redis as the original
//! system's broker backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::{Task, TaskBroker};

const READY_LIST: &str = "broker:ready";
const DELAYED_SET: &str = "broker:delayed";
const BLOCK_TIMEOUT_SECS: f64 = 5.0;

#[derive(Clone)]
pub struct RedisBroker {
    conn: ConnectionManager,
}

impl RedisBroker {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    fn processing_list(consumer_id: &str) -> String {
        format!("broker:processing:{consumer_id}")
    }
}

#[async_trait]
impl TaskBroker for RedisBroker {
    async fn enqueue(&self, task: Task, eta: Option<DateTime<Utc>>) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(&task)?;

        match eta {
            Some(due_at) if due_at > Utc::now() => {
                let score = due_at.timestamp_millis();
                let _: () = conn.zadd(DELAYED_SET, payload, score).await?;
            }
            _ => {
                let _: () = conn.lpush(READY_LIST, payload).await?;
            }
        }
        Ok(())
    }

    async fn dequeue(&self, consumer_id: &str) -> anyhow::Result<Option<Task>> {
        let mut conn = self.conn.clone();
        let processing = Self::processing_list(consumer_id);

        let payload: Option<String> = conn
            .blmove(
                READY_LIST,
                &processing,
                redis::Direction::Right,
                redis::Direction::Left,
                BLOCK_TIMEOUT_SECS,
            )
            .await?;

        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn ack(&self, consumer_id: &str, task: &Task) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let processing = Self::processing_list(consumer_id);
        let payload = serde_json::to_string(task)?;
        let _: () = conn.lrem(&processing, 1, payload).await?;
        Ok(())
    }

    async fn promote_due(&self) -> anyhow::Result<u64> {
        let mut conn = self.conn.clone();
        let now = Utc::now().timestamp_millis();

        let due: Vec<String> = conn.zrangebyscore(DELAYED_SET, 0, now).await?;
        let mut promoted = 0u64;
        for payload in due {
            let removed: i64 = conn.zrem(DELAYED_SET, &payload).await?;
            if removed > 0 {
                let _: () = conn.lpush(READY_LIST, &payload).await?;
                promoted += 1;
            }
        }
        Ok(promoted)
    }
}
