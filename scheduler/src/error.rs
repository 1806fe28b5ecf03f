//! Error taxonomy shared across the scheduler, worker, and load-run components.
//!
//! Components never surface raw store/broker errors upward; they wrap the
//! underlying cause in one of these variants so callers can branch on kind
//! without string-matching, while interior propagation still uses
//! `anyhow::Result` + `.context(...)`.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("transient infrastructure failure: {message}")]
    TransientInfra {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("remote http failure for execution {execution_id}: {message}")]
    RemoteHttp {
        execution_id: Uuid,
        message: String,
    },

    #[error("terminal condition for job {job_id:?}: {message}")]
    Terminal {
        job_id: Option<Uuid>,
        message: String,
    },

    #[error("cascade step failed: {message}")]
    Cascade {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl SchedulerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::TransientInfra {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn terminal(job_id: Option<Uuid>, message: impl Into<String>) -> Self {
        Self::Terminal {
            job_id,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
