pub mod redis_broker;

pub use redis_broker::RedisBroker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One task delivered by the broker. `args` is an opaque JSON envelope the
/// consumer deserializes according to `task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task: String,
    pub args: serde_json::Value,
}

#[async_trait]
pub trait TaskBroker: Send + Sync {
    /// Deliver `task` immediately, or no earlier than `eta` if set.
    async fn enqueue(&self, task: Task, eta: Option<DateTime<Utc>>) -> anyhow::Result<()>;

    /// Block until a task is available, moving it into a per-consumer
    /// processing list for late-ack. Returns `None` if the broker is
    /// shutting down.
    async fn dequeue(&self, consumer_id: &str) -> anyhow::Result<Option<Task>>;

    /// Acknowledge successful processing, removing the task from the
    /// consumer's processing list.
    async fn ack(&self, consumer_id: &str, task: &Task) -> anyhow::Result<()>;

    /// Move any due items from the delayed set into the ready list. Callers
    /// run this periodically (e.g. once per poller tick) rather than
    /// relying on a separate mover process.
    async fn promote_due(&self) -> anyhow::Result<u64>;
}

pub const EXECUTE_JOB_TASK: &str = "execute-job";
pub const RUN_COLLECTION_TASK: &str = "run-collection";

pub fn execute_job_task(execution_id: uuid::Uuid) -> Task {
    Task {
        task: EXECUTE_JOB_TASK.to_string(),
        args: serde_json::json!({ "execution_id": execution_id }),
    }
}

pub fn run_collection_task(run_id: uuid::Uuid) -> Task {
    Task {
        task: RUN_COLLECTION_TASK.to_string(),
        args: serde_json::json!({ "run_id": run_id }),
    }
}
