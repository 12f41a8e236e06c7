use crate::error::Error;
use crate::events::JobStatus;
use crate::result::JobResult;
use crate::types::{JobId, OutputBlob};

use std::time::Duration;

const SUCCESS_MESSAGE: &str = "Job executed successfully";
const SUCCESS_DETAILS: &str = "All tasks completed without errors";
const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// How the supervised process ended, as far as the supervisor could observe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessExit {
    /// No process was ever created.
    NotStarted(Error),
    Code(i32),
    Signal(i32),
    /// The process was started but its exit status could not be collected.
    Lost(String),
}

/// Raw observations handed to [`classify`].
#[derive(Clone, Debug)]
pub struct RawOutcome {
    pub job_id: JobId,
    pub exit: ProcessExit,
    pub stdout: Option<OutputBlob>,
    pub stderr: Option<OutputBlob>,
    pub elapsed: Duration,
    pub timed_out: bool,
    pub cancelled: bool,
    /// The overall timeout that applied, reported when `timed_out` is set.
    pub timeout: Duration,
}

/// Turn raw observations into a [`JobResult`].
///
/// First match wins: cancellation, timeout, process never started, exit code zero, anything else.
pub fn classify(raw: RawOutcome) -> JobResult {
    let return_code = match raw.exit {
        ProcessExit::Code(code) => Some(code),
        _ => None,
    };
    let stdout = raw.stdout.as_deref().map(lossy);
    let stderr = raw.stderr.as_deref().map(lossy);
    // stderr goes out as captured, whitespace only counts as empty
    let stderr_or = |fallback: String| match stderr.as_deref() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => fallback,
    };

    let (error, details) = if raw.cancelled {
        let details = format!(
            "Cancelled by request after {:.2} seconds",
            raw.elapsed.as_secs_f64()
        );
        (Some(Error::Cancelled), details)
    } else if raw.timed_out {
        let error = Error::Timeout(raw.timeout);
        let details = error.to_string();
        (Some(error), details)
    } else {
        match raw.exit {
            ProcessExit::NotStarted(error) => {
                let details = error.to_string();
                (Some(error), details)
            }
            ProcessExit::Code(0) => (None, SUCCESS_DETAILS.to_string()),
            ProcessExit::Code(code) => {
                let error = Error::NonZeroExit {
                    code: Some(code),
                    signal: None,
                };
                (Some(error), stderr_or(UNKNOWN_ERROR.to_string()))
            }
            ProcessExit::Signal(signal) => {
                let error = Error::NonZeroExit {
                    code: None,
                    signal: Some(signal),
                };
                let details = stderr_or(error.to_string());
                (Some(error), details)
            }
            ProcessExit::Lost(reason) => {
                let error = Error::NonZeroExit {
                    code: None,
                    signal: None,
                };
                (Some(error), stderr_or(reason))
            }
        }
    };

    let (status, message) = match &error {
        Some(error) => (error.status(), error.summary()),
        None => (JobStatus::Succeeded, SUCCESS_MESSAGE),
    };

    JobResult {
        job_id: raw.job_id,
        status,
        message: message.to_string(),
        details: Some(details),
        stdout,
        stderr,
        return_code,
        duration: raw.elapsed,
        error,
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
