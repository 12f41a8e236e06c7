use super::reporter::ProgressSender;
use super::{supervisor, JobExecutor};
use crate::error::Error;
use crate::events::JobStatus;
use crate::request::JobRequest;
use crate::result::JobResult;
use crate::types::JobId;

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::error;

/// A job running on its own tokio task.
///
/// Dropping the handle detaches the job: it still runs to its terminal state, the result is just
/// not observed. Use [`RunningJob::cancel`] to stop it.
pub struct RunningJob {
    job_id: JobId,
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<JobResult>,
}

impl RunningJob {
    pub(crate) fn spawn(
        executor: &JobExecutor,
        request: JobRequest,
        observer: Option<ProgressSender>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        match executor.submit(request) {
            Ok(handle) => {
                let job_id = handle.id();
                let task = tokio::spawn(supervisor::supervise(handle, observer, Some(cancel_rx)));
                Self {
                    job_id,
                    cancel_tx: Some(cancel_tx),
                    task,
                }
            }
            Err(err) => {
                let job_id = JobId::new_v4();
                let task = tokio::spawn(async move { supervisor::reject(job_id, err, observer) });
                Self {
                    job_id,
                    cancel_tx: None,
                    task,
                }
            }
        }
    }

    pub fn id(&self) -> JobId {
        self.job_id
    }

    /// Request cancellation. Returns `false` if cancellation was already requested or the job
    /// has already finished.
    pub fn cancel(&mut self) -> bool {
        match self.cancel_tx.take() {
            Some(cancel_tx) => cancel_tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal result.
    pub async fn wait(self) -> JobResult {
        let RunningJob {
            job_id,
            cancel_tx,
            task,
        } = self;
        let result = task.await;
        drop(cancel_tx);
        match result {
            Ok(result) => result,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "job task failed");
                let error = Error::Spawn(format!("job task failed: {e}"));
                JobResult {
                    job_id,
                    status: JobStatus::Failed,
                    message: error.summary().to_string(),
                    details: Some(error.to_string()),
                    stdout: None,
                    stderr: None,
                    return_code: None,
                    duration: Duration::ZERO,
                    error: Some(error),
                }
            }
        }
    }
}
