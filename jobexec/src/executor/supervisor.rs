use super::classifier::{classify, ProcessExit, RawOutcome};
use super::launcher::{self, JobHandle};
use super::output::OutputCapture;
use super::reporter::{ProgressReporter, ProgressSender};
use crate::error::Error;
use crate::events::JobStatus;
use crate::result::JobResult;
use crate::types::JobId;

use futures::future;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn, Instrument};

enum Ending {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Drive one job from spawn to its single terminal result, inside a span carrying its id.
pub(crate) async fn supervise(
    handle: JobHandle,
    observer: Option<ProgressSender>,
    cancel: Option<oneshot::Receiver<()>>,
) -> JobResult {
    let span = tracing::info_span!("job", job_id = %handle.id);
    supervise_job(handle, observer, cancel)
        .instrument(span)
        .await
}

async fn supervise_job(
    handle: JobHandle,
    observer: Option<ProgressSender>,
    cancel: Option<oneshot::Receiver<()>>,
) -> JobResult {
    let started = Instant::now();
    let mut reporter = ProgressReporter::new(handle.id, started, observer);
    reporter.notify(JobStatus::Pending, "Job queued", None, None);

    info!(
        target_path = %handle.target.display(),
        timeout_s = handle.timeout.as_secs_f64(),
        "starting job"
    );

    // both are watched from here on, including while the process is being spawned
    let deadline = time::sleep(handle.timeout);
    tokio::pin!(deadline);
    let cancelled = cancellation(cancel);
    tokio::pin!(cancelled);

    let spawned = tokio::select! {
        biased;
        _ = &mut cancelled => Err((Error::Cancelled, false, true)),
        _ = &mut deadline => Err((Error::Timeout(handle.timeout), true, false)),
        spawned = launcher::spawn(&handle) => spawned.map_err(|err| (err, false, false)),
    };
    let mut child = match spawned {
        Ok(child) => child,
        Err((err, timed_out, cancelled)) => {
            if timed_out || cancelled {
                info!(error = %err, "job ended before its process started");
            } else {
                error!(error = %err, "job process failed to start");
            }
            let result = classify(RawOutcome {
                job_id: handle.id,
                exit: ProcessExit::NotStarted(err),
                stdout: None,
                stderr: None,
                elapsed: started.elapsed(),
                timed_out,
                cancelled,
                timeout: handle.timeout,
            });
            reporter.finish(&result);
            return result;
        }
    };
    debug!(pid = ?child.id(), "job process started");

    let capture = OutputCapture::start(&mut child);
    let task_label = handle
        .target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    reporter.notify(
        JobStatus::Running,
        "Starting job execution",
        Some(0),
        task_label.as_deref(),
    );

    // Either the process exits on its own, the overall budget runs out, or the caller cancels.
    let ending = tokio::select! {
        status = child.wait() => Ending::Exited(status),
        _ = &mut deadline => Ending::TimedOut,
        _ = &mut cancelled => Ending::Cancelled,
    };

    let (exit, timed_out, cancelled) = match ending {
        Ending::Exited(Ok(status)) => (exit_of(status), false, false),
        Ending::Exited(Err(e)) => {
            error!(error = %e, "waiting for job process failed");
            (ProcessExit::Lost(e.to_string()), false, false)
        }
        Ending::TimedOut => {
            warn!(
                timeout_s = handle.timeout.as_secs_f64(),
                "job timed out; terminating process"
            );
            (shutdown(&mut child, handle.grace_period).await, true, false)
        }
        Ending::Cancelled => {
            info!("cancellation requested; terminating process");
            (shutdown(&mut child, handle.grace_period).await, false, true)
        }
    };

    let output = capture.drain(handle.grace_period).await;
    let result = classify(RawOutcome {
        job_id: handle.id,
        exit,
        stdout: Some(output.stdout),
        stderr: Some(output.stderr),
        elapsed: started.elapsed(),
        timed_out,
        cancelled,
        timeout: handle.timeout,
    });

    info!(
        status = %result.status,
        exit_code = ?result.return_code,
        elapsed_ms = result.duration.as_millis() as u64,
        truncated = output.truncated,
        "job finished"
    );
    reporter.finish(&result);
    result
}

/// Result for a request rejected before anything was spawned.
pub(crate) fn reject(job_id: JobId, err: Error, observer: Option<ProgressSender>) -> JobResult {
    warn!(job_id = %job_id, error = %err, "job request rejected");
    let mut reporter = ProgressReporter::new(job_id, Instant::now(), observer);
    let result = classify(RawOutcome {
        job_id,
        exit: ProcessExit::NotStarted(err),
        stdout: None,
        stderr: None,
        elapsed: Duration::ZERO,
        timed_out: false,
        cancelled: false,
        timeout: Duration::ZERO,
    });
    reporter.finish(&result);
    result
}

/// Resolves when the caller asks for cancellation. A dropped sender never cancels.
async fn cancellation(cancel: Option<oneshot::Receiver<()>>) {
    if let Some(cancel_rx) = cancel {
        if cancel_rx.await.is_ok() {
            return;
        }
        debug!("cancel channel closed without explicit cancellation");
    }
    future::pending::<()>().await
}

/// Two-phase shutdown: ask the process group to terminate, wait up to `grace`, then kill.
async fn shutdown(child: &mut Child, grace: Duration) -> ProcessExit {
    terminate(child);
    match time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => return exit_of(status),
        Ok(Err(e)) => return ProcessExit::Lost(e.to_string()),
        Err(_) => warn!(
            grace_ms = grace.as_millis() as u64,
            "process still running after grace period; killing"
        ),
    }

    force_kill(child);
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill job process");
    }
    match child.wait().await {
        Ok(status) => exit_of(status),
        Err(e) => ProcessExit::Lost(e.to_string()),
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    signal_group(child, nix::sys::signal::Signal::SIGTERM);
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    // no graceful signal available; the grace wait still applies
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "failed to kill job process");
    }
}

#[cfg(unix)]
fn force_kill(child: &mut Child) {
    signal_group(child, nix::sys::signal::Signal::SIGKILL);
}

#[cfg(not(unix))]
fn force_kill(_child: &mut Child) {}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) {
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    // already reaped
    let Some(pid) = child.id() else {
        return;
    };
    // the child leads its own process group, see launcher::build_command
    if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
        debug!(pid, signal = ?signal, error = %e, "failed to signal process group");
    }
}

fn exit_of(status: ExitStatus) -> ProcessExit {
    if let Some(code) = status.code() {
        return ProcessExit::Code(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ProcessExit::Signal(signal);
        }
    }
    ProcessExit::Lost(format!("no exit code in status {status}"))
}
