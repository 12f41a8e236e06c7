use crate::types::{EnvOverlay, ExtraVars};
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to run one job.
///
/// Timeouts left unset fall back to the executor's configured defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRequest {
    pub target: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub extra_vars: ExtraVars,
    pub env: EnvOverlay,
    pub timeout: Option<Duration>,
    pub start_timeout: Option<Duration>,
}

impl JobRequest {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            working_dir: None,
            extra_vars: Vec::new(),
            env: Vec::new(),
            timeout: None,
            start_timeout: None,
        }
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Append an extra variable. Variables are passed to the launcher in the order they are added.
    pub fn extra_var(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra_vars.push((key.into(), value.to_string()));
        self
    }

    pub fn extra_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.extra_vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.to_string())));
        self
    }

    /// Set an environment variable for the child, replacing any inherited value.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }
}
