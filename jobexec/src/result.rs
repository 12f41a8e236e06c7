use crate::error::Error;
use crate::events::JobStatus;
use crate::types::JobId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The single terminal outcome of a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Short fixed summary of the outcome.
    pub message: String,
    /// Variable diagnostic payload, e.g. captured stderr for a failed run.
    pub details: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub return_code: Option<i32>,
    pub duration: Duration,
    /// Classified error for every outcome other than `Succeeded`.
    pub error: Option<Error>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Flatten into the caller-facing form. Captured output is only carried over for failure
    /// kinds so successful runs do not leak their internals.
    pub fn to_api(&self) -> ApiResult {
        let (stdout, stderr) = if self.status.is_failure() {
            (self.stdout.clone(), self.stderr.clone())
        } else {
            (None, None)
        };
        ApiResult {
            status: self.status,
            message: self.message.clone(),
            details: self.details.clone(),
            return_code: self.return_code,
            duration: self.duration.as_secs_f64(),
            stdout,
            stderr,
        }
    }
}

impl From<JobResult> for ApiResult {
    fn from(result: JobResult) -> Self {
        result.to_api()
    }
}

/// Flat, serializable view of a [`JobResult`] for API handlers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    pub status: JobStatus,
    pub message: String,
    pub details: Option<String>,
    pub return_code: Option<i32>,
    /// Seconds.
    pub duration: f64,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}
