//! The job execution service.
//!
//! - [`launcher`] validates requests and builds the process invocation.
//! - [`supervisor`] runs the process under the start and overall timeouts and handles
//!   cancellation and the terminate-then-kill shutdown.
//! - [`reporter`] delivers progress events to an optional observer.
//! - [`classifier`] turns what was observed into a [`JobResult`].
//! - [`output`] drains the child's pipes.
//! - [`running`] wraps a job spawned onto its own task.

mod classifier;
mod launcher;
mod output;
mod reporter;
mod running;
mod supervisor;

pub use classifier::{classify, ProcessExit, RawOutcome};
pub use launcher::{JobHandle, EXTRA_VARS_FLAG};
pub use reporter::ProgressSender;
pub use running::RunningJob;

use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::request::JobRequest;
use crate::result::JobResult;
use crate::types::JobId;

use std::sync::Arc;
use tokio::sync::oneshot;

/// Runs external jobs.
///
/// Holds nothing but its configuration, so it can be cloned freely and shared between tasks;
/// jobs never share state with each other.
#[derive(Clone, Debug, Default)]
pub struct JobExecutor {
    config: Arc<ExecutorConfig>,
}

impl JobExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validate a request and resolve it into a runnable handle. No process is created.
    pub fn submit(&self, request: JobRequest) -> Result<JobHandle> {
        launcher::prepare(&self.config, request)
    }

    /// Run a submitted job to completion.
    ///
    /// Progress goes to `observer` if one is given. Sending `()` on the other end of `cancel`
    /// cancels the job; dropping that sender does not.
    pub async fn run(
        &self,
        handle: JobHandle,
        observer: Option<ProgressSender>,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> JobResult {
        supervisor::supervise(handle, observer, cancel).await
    }

    /// Submit and run in one call. A rejected request produces a `Failed` result without
    /// spawning anything.
    pub async fn execute(
        &self,
        request: JobRequest,
        observer: Option<ProgressSender>,
        cancel: Option<oneshot::Receiver<()>>,
    ) -> JobResult {
        match self.submit(request) {
            Ok(handle) => self.run(handle, observer, cancel).await,
            Err(err) => supervisor::reject(JobId::new_v4(), err, observer),
        }
    }

    /// Run a job on its own task and return a handle to it.
    pub fn spawn(&self, request: JobRequest, observer: Option<ProgressSender>) -> RunningJob {
        RunningJob::spawn(self, request, observer)
    }
}
