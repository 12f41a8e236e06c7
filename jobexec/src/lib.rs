pub mod config;
pub mod error;
mod events;
pub mod executor;
pub mod logging;
mod request;
mod result;
pub mod types;

pub use config::ExecutorConfig;
pub use error::{Error, JobError, ValidationError};
pub use events::{JobProgress, JobStatus, Output};
pub use executor::{JobExecutor, JobHandle, ProgressSender, RunningJob};
pub use request::JobRequest;
pub use result::{ApiResult, JobResult};
