use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "execution_status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Success,
    Failure,
    TimedOut,
    DeadLetter,
}

impl ExecutionStatus {
    /// True once a row will never be mutated again. `Failure`/`TimedOut` are
    /// terminal *for this row*: a retry creates a brand new `JobExecution`
    /// rather than reopening this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success
                | ExecutionStatus::Failure
                | ExecutionStatus::TimedOut
                | ExecutionStatus::DeadLetter
        )
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobExecution {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: ExecutionStatus,
    pub attempt: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub duration_ms: Option<i64>,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Max stored length for a response body snapshot, in bytes.
pub const RESPONSE_BODY_TRUNCATE_BYTES: usize = 10 * 1024;

impl JobExecution {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_dead_letter_are_terminal() {
        assert!(ExecutionStatus::Success.is_terminal());
        assert!(ExecutionStatus::DeadLetter.is_terminal());
        assert!(ExecutionStatus::Failure.is_terminal());
        assert!(ExecutionStatus::TimedOut.is_terminal());
        assert!(!ExecutionStatus::Queued.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
    }
}
