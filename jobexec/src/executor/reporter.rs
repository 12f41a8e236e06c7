use crate::events::{JobProgress, JobStatus};
use crate::result::JobResult;
use crate::types::JobId;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Where progress events for a job are delivered.
pub type ProgressSender = mpsc::UnboundedSender<JobProgress>;

pub(crate) struct ProgressReporter {
    job_id: JobId,
    started: Instant,
    observer: Option<ProgressSender>,
    finished: bool,
}

impl ProgressReporter {
    pub(crate) fn new(job_id: JobId, started: Instant, observer: Option<ProgressSender>) -> Self {
        Self {
            job_id,
            started,
            observer,
            finished: false,
        }
    }

    pub(crate) fn notify(
        &mut self,
        status: JobStatus,
        message: &str,
        percent: Option<u8>,
        current_task: Option<&str>,
    ) {
        if self.finished || self.observer.is_none() {
            return;
        }
        let progress = JobProgress {
            job_id: self.job_id,
            status,
            message: message.to_string(),
            percent,
            current_task: current_task.map(str::to_string),
            details: None,
            elapsed: self.started.elapsed(),
        };
        self.send(progress);
    }

    /// Emit the terminal event for `result`. Only the first call has any effect.
    pub(crate) fn finish(&mut self, result: &JobResult) {
        if self.finished {
            return;
        }
        self.finished = true;
        if self.observer.is_none() {
            return;
        }
        let progress = JobProgress {
            job_id: self.job_id,
            status: result.status,
            message: result.message.clone(),
            percent: result.is_success().then_some(100),
            current_task: None,
            details: result.details.clone(),
            elapsed: self.started.elapsed(),
        };
        self.send(progress);
    }

    fn send(&mut self, progress: JobProgress) {
        if let Some(observer) = &self.observer {
            if observer.send(progress).is_err() {
                debug!(job_id = %self.job_id, "progress observer dropped; no further events");
                self.observer = None;
            }
        }
    }
}
