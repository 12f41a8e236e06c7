use crate::events::JobStatus;
use std::path::PathBuf;
use std::result;
use std::time::Duration;

/// Reasons a request is rejected before any process is created.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("could not find target at {}", .0.display())]
    TargetNotFound(PathBuf),
    #[error("target {} is outside the allowed root {}", .target.display(), .root.display())]
    OutsideAllowedRoot { target: PathBuf, root: PathBuf },
    #[error("target {} is not a regular file", .0.display())]
    TargetNotAFile(PathBuf),
    #[error("could not find launcher {}", .0.display())]
    LauncherNotFound(PathBuf),
    #[error("working directory {} does not exist", .0.display())]
    WorkingDirNotFound(PathBuf),
    #[error("invalid extra variable name {0:?}")]
    InvalidExtraVar(String),
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Every way a job can end other than success.
///
/// The variants are mutually exclusive and none of them is retried internally.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to start process: {0}")]
    Spawn(String),
    #[error("execution exceeded {} seconds", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("job was cancelled")]
    Cancelled,
    #[error("{}", describe_exit(.code, .signal))]
    NonZeroExit {
        code: Option<i32>,
        signal: Option<i32>,
    },
}

impl Error {
    /// The terminal status this error surfaces as.
    pub fn status(&self) -> JobStatus {
        match self {
            Error::Validation(_) | Error::Spawn(_) | Error::NonZeroExit { .. } => {
                JobStatus::Failed
            }
            Error::Timeout(_) => JobStatus::TimedOut,
            Error::Cancelled => JobStatus::Cancelled,
        }
    }

    /// Short fixed summary, suitable as a result message.
    pub fn summary(&self) -> &'static str {
        match self {
            Error::Validation(ValidationError::TargetNotFound(_)) => "Playbook not found",
            Error::Validation(ValidationError::LauncherNotFound(_)) => "Launcher not found",
            Error::Validation(_) => "Invalid job request",
            Error::Spawn(_) => "Job failed to start",
            Error::Timeout(_) => "Job execution timed out",
            Error::Cancelled => "Job execution cancelled",
            Error::NonZeroExit { signal: Some(_), .. } => "Job terminated by signal",
            Error::NonZeroExit { .. } => "Job execution failed",
        }
    }
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("process exited with code {code}"),
        (None, Some(signal)) => format!("process terminated by signal {signal}"),
        (None, None) => "process exit status unknown".to_string(),
    }
}

pub type JobError = Error;
pub type Result<T> = result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_terminal_statuses() {
        let validation: Error = ValidationError::ZeroTimeout("timeout").into();
        assert_eq!(validation.status(), JobStatus::Failed);
        assert_eq!(Error::Spawn("nope".into()).status(), JobStatus::Failed);
        assert_eq!(
            Error::Timeout(Duration::from_secs(3)).status(),
            JobStatus::TimedOut
        );
        assert_eq!(Error::Cancelled.status(), JobStatus::Cancelled);
        let exit = Error::NonZeroExit {
            code: Some(2),
            signal: None,
        };
        assert_eq!(exit.status(), JobStatus::Failed);
        assert_eq!(exit.to_string(), "process exited with code 2");
    }

    #[test]
    fn timeout_message_is_in_seconds() {
        let err = Error::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "execution exceeded 1.5 seconds");
    }
}
