#![allow(dead_code)]

use jobexec::{logging, ExecutorConfig, JobExecutor, JobProgress};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const GRACE: Duration = Duration::from_millis(300);

/// A playbook root in a temp dir, with an executor that runs targets through `/bin/sh`.
pub struct Fixture {
    pub root: TempDir,
    pub executor: JobExecutor,
}

impl Fixture {
    pub fn new() -> Self {
        logging::init_test_logging();
        let root = tempfile::tempdir().expect("tempdir");
        let executor = JobExecutor::new(Self::config(root.path()));
        Self { root, executor }
    }

    pub fn config(root: &Path) -> ExecutorConfig {
        ExecutorConfig::new(root)
            .with_launcher("/bin/sh")
            .with_grace_period(GRACE)
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.executor = JobExecutor::new(config);
        self
    }

    /// Write a script below the root and return its relative name.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        fs::write(self.root.path().join(name), body).expect("write script");
        PathBuf::from(name)
    }

    /// Write an executable file below the root.
    pub fn executable(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, body).expect("write executable");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

pub fn observer() -> (
    mpsc::UnboundedSender<JobProgress>,
    mpsc::UnboundedReceiver<JobProgress>,
) {
    mpsc::unbounded_channel()
}

/// Everything still queued on the receiver. Call after the job has returned.
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<JobProgress>) -> Vec<JobProgress> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn read_pid(path: &Path) -> i32 {
    fs::read_to_string(path)
        .expect("pid file")
        .trim()
        .parse()
        .expect("pid")
}

pub fn process_gone(pid: i32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_err()
}
