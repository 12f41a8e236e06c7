use crate::config::ExecutorConfig;
use crate::error::{Error, Result, ValidationError};
use crate::request::JobRequest;
use crate::types::JobId;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinError;
use tokio::time;
use tracing::debug;

pub const EXTRA_VARS_FLAG: &str = "--extra-vars";

/// A validated job, ready to be run.
///
/// Holds the fully resolved invocation and a snapshot of the environment taken at submit time.
/// Creating a handle allocates no OS resources. Running it consumes it.
#[derive(Debug)]
pub struct JobHandle {
    pub(crate) id: JobId,
    pub(crate) target: PathBuf,
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<OsString>,
    pub(crate) working_dir: PathBuf,
    pub(crate) env: HashMap<OsString, OsString>,
    pub(crate) timeout: Duration,
    pub(crate) start_timeout: Duration,
    pub(crate) grace_period: Duration,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    // program first
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn env_var(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.env.get(key.as_ref()).map(OsString::as_os_str)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }
}

pub(crate) fn prepare(config: &ExecutorConfig, request: JobRequest) -> Result<JobHandle> {
    let JobRequest {
        target,
        working_dir,
        extra_vars,
        env: overlay,
        timeout,
        start_timeout,
    } = request;

    let timeout = non_zero(timeout.unwrap_or(config.default_timeout), "timeout")?;
    let start_timeout = non_zero(
        start_timeout.unwrap_or(config.start_timeout),
        "start timeout",
    )?;
    for (key, _) in &extra_vars {
        if key.is_empty() || key.contains('=') || key.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidExtraVar(key.clone()).into());
        }
    }

    let root = fs::canonicalize(&config.allowed_root)
        .map_err(|_| ValidationError::WorkingDirNotFound(config.allowed_root.clone()))?;
    let target = resolve_target(&root, &target)?;

    // inherited environment with the overlay on top, copied once per job
    let mut env: HashMap<OsString, OsString> = std::env::vars_os().collect();
    env.extend(
        overlay
            .into_iter()
            .map(|(key, value)| (OsString::from(key), OsString::from(value))),
    );

    let program = resolve_launcher(&config.launcher, env.get(OsStr::new("PATH")))
        .ok_or_else(|| ValidationError::LauncherNotFound(config.launcher.clone()))?;

    let working_dir = match working_dir {
        Some(dir) if dir.is_relative() => root.join(dir),
        Some(dir) => dir,
        None => root,
    };
    if !working_dir.is_dir() {
        return Err(ValidationError::WorkingDirNotFound(working_dir).into());
    }

    let args = build_args(&config.launcher_args, &target, &extra_vars);

    Ok(JobHandle {
        id: JobId::new_v4(),
        target,
        program,
        args,
        working_dir,
        env,
        timeout,
        start_timeout,
        grace_period: config.grace_period,
    })
}

fn non_zero(value: Duration, what: &'static str) -> Result<Duration> {
    if value.is_zero() {
        Err(ValidationError::ZeroTimeout(what).into())
    } else {
        Ok(value)
    }
}

/// Resolve the target against the allowed root. Canonicalizing before the prefix check catches
/// `..` components and symlinks pointing out of the root.
fn resolve_target(root: &Path, target: &Path) -> Result<PathBuf> {
    let joined = if target.is_absolute() {
        target.to_path_buf()
    } else {
        root.join(target)
    };
    let canonical =
        fs::canonicalize(&joined).map_err(|_| ValidationError::TargetNotFound(joined.clone()))?;
    if !canonical.starts_with(root) {
        return Err(ValidationError::OutsideAllowedRoot {
            target: canonical,
            root: root.to_path_buf(),
        }
        .into());
    }
    if !canonical.is_file() {
        return Err(ValidationError::TargetNotAFile(canonical).into());
    }
    Ok(canonical)
}

/// Paths with a separator are taken as given, bare names are searched on `path_var`.
fn resolve_launcher(launcher: &Path, path_var: Option<&OsString>) -> Option<PathBuf> {
    if launcher.components().count() > 1 || launcher.is_absolute() {
        let path = if launcher.is_absolute() {
            launcher.to_path_buf()
        } else {
            std::env::current_dir().ok()?.join(launcher)
        };
        return path.is_file().then_some(path);
    }
    std::env::split_paths(path_var?)
        .map(|dir| dir.join(launcher))
        .find(|candidate| candidate.is_file())
}

/// Arguments after the program: launcher args, the target, then one `--extra-vars key=value`
/// pair per variable in insertion order.
pub(crate) fn build_args(
    launcher_args: &[String],
    target: &Path,
    extra_vars: &[(String, String)],
) -> Vec<OsString> {
    let mut args: Vec<OsString> = launcher_args.iter().map(OsString::from).collect();
    args.push(target.as_os_str().to_os_string());
    for (key, value) in extra_vars {
        args.push(EXTRA_VARS_FLAG.into());
        args.push(format!("{key}={value}").into());
    }
    args
}

fn build_command(handle: &JobHandle) -> Command {
    let mut command = Command::new(&handle.program);
    command
        .args(&handle.args)
        .current_dir(&handle.working_dir)
        .env_clear()
        .envs(&handle.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // own process group, so termination reaches everything the job starts
    #[cfg(unix)]
    command.process_group(0);
    command
}

/// Spawn the job's process, giving up after the handle's start timeout.
///
/// The spawn runs on the blocking pool. If it completes after the deadline the child is dropped
/// there and `kill_on_drop` takes care of it.
pub(crate) async fn spawn(handle: &JobHandle) -> Result<Child> {
    let mut command = build_command(handle);
    let program = handle.program.display().to_string();
    debug!(argv = ?handle.argv(), dir = %handle.working_dir.display(), "spawning process");

    let spawning = tokio::task::spawn_blocking(move || command.spawn());
    bounded_start(spawning, handle.start_timeout, &program).await
}

async fn bounded_start<F, T>(spawning: F, start_timeout: Duration, program: &str) -> Result<T>
where
    F: Future<Output = std::result::Result<io::Result<T>, JoinError>>,
{
    match time::timeout(start_timeout, spawning).await {
        Ok(Ok(Ok(spawned))) => Ok(spawned),
        Ok(Ok(Err(e))) => Err(Error::Spawn(format!("{program}: {e}"))),
        Ok(Err(e)) => Err(Error::Spawn(format!("{program}: spawn task failed: {e}"))),
        Err(_) => Err(Error::Spawn(format!(
            "{program}: process did not start within {} seconds",
            start_timeout.as_secs_f64()
        ))),
    }
}
