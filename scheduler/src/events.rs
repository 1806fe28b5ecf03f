//! Lifecycle facts emitted for structured logging of job/execution state
//! transitions. Adapted from the teacher's `JobEvent` enum, generalized
//! from "event bus payload" to "tracing-emitted fact" since no event bus is
//! carried over here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchedulerEvent {
    JobClaimed {
        job_id: Uuid,
        execution_id: Uuid,
    },
    ExecutionStarted {
        execution_id: Uuid,
        worker_id: String,
        attempt: i32,
    },
    ExecutionSucceeded {
        execution_id: Uuid,
        duration_ms: i64,
    },
    ExecutionFailed {
        execution_id: Uuid,
        error: String,
        attempt: i32,
        will_retry: bool,
    },
    ExecutionDeadLettered {
        execution_id: Uuid,
        total_attempts: i32,
        final_error: String,
    },
    RunCompleted {
        run_id: Uuid,
        total: i64,
        success: i64,
        failed: i64,
    },
}

impl SchedulerEvent {
    /// Emits this event as a structured `tracing` record. Callers fire this
    /// at the point of the fact (claim, start, finish) rather than building
    /// up ad hoc log lines.
    pub fn log(&self) {
        match serde_json::to_string(self) {
            Ok(json) => tracing::info!(event = %json, "scheduler event"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize scheduler event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_claimed_serializes() {
        let event = SchedulerEvent::JobClaimed {
            job_id: Uuid::new_v4(),
            execution_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("JobClaimed"));
    }

    #[test]
    fn execution_dead_lettered_serializes() {
        let event = SchedulerEvent::ExecutionDeadLettered {
            execution_id: Uuid::new_v4(),
            total_attempts: 3,
            final_error: "boom".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("total_attempts"));
    }

    #[test]
    fn events_roundtrip() {
        let events = vec![
            SchedulerEvent::JobClaimed {
                job_id: Uuid::new_v4(),
                execution_id: Uuid::new_v4(),
            },
            SchedulerEvent::ExecutionStarted {
                execution_id: Uuid::new_v4(),
                worker_id: "worker-1".into(),
                attempt: 1,
            },
            SchedulerEvent::ExecutionSucceeded {
                execution_id: Uuid::new_v4(),
                duration_ms: 120,
            },
            SchedulerEvent::RunCompleted {
                run_id: Uuid::new_v4(),
                total: 10,
                success: 9,
                failed: 1,
            },
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let _: SchedulerEvent = serde_json::from_str(&json).unwrap();
        }
    }
}
