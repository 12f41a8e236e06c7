use crate::types::{JobId, OutputBlob};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle state of a job.
///
/// `Pending` -> `Running` is the only non-terminal transition, every other state is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Terminal states that did not end in success. Captured output is only exposed to API
    /// callers for these.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            JobStatus::Failed | JobStatus::TimedOut | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A progress update for a single job.
///
/// `elapsed` is measured on a monotonic clock from the moment the supervisor picked the job up,
/// so the events of one job never go backwards in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: String,
    pub percent: Option<u8>,
    pub current_task: Option<String>,
    pub details: Option<String>,
    pub elapsed: Duration,
}

/// A chunk of child process output, tagged with the stream it came from.
#[derive(Clone, Debug)]
pub enum Output {
    Stdout(OutputBlob),
    Stderr(OutputBlob),
}
