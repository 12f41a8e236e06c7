use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LAUNCHER: &str = "ansible-playbook";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Settings shared by every job an executor runs. Durations deserialize from seconds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Also the default working directory.
    pub allowed_root: PathBuf,
    pub launcher: PathBuf,
    pub launcher_args: Vec<String>,
    #[serde(rename = "default_timeout_secs", deserialize_with = "secs")]
    pub default_timeout: Duration,
    #[serde(rename = "start_timeout_secs", deserialize_with = "secs")]
    pub start_timeout: Duration,
    #[serde(rename = "grace_period_secs", deserialize_with = "secs")]
    pub grace_period: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            allowed_root: PathBuf::from("."),
            launcher: PathBuf::from(DEFAULT_LAUNCHER),
            launcher_args: Vec::new(),
            default_timeout: DEFAULT_TIMEOUT,
            start_timeout: DEFAULT_START_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl ExecutorConfig {
    pub fn new(allowed_root: impl Into<PathBuf>) -> Self {
        Self {
            allowed_root: allowed_root.into(),
            ..Self::default()
        }
    }

    pub fn with_launcher(mut self, launcher: impl AsRef<Path>) -> Self {
        self.launcher = launcher.as_ref().to_path_buf();
        self
    }

    pub fn with_launcher_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.launcher_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }
}

fn secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: ExecutorConfig = serde_json::from_str(
            r#"{ "allowed_root": "/srv/playbooks", "grace_period_secs": 0.5 }"#,
        )
        .expect("config parse");
        assert_eq!(cfg.allowed_root, PathBuf::from("/srv/playbooks"));
        assert_eq!(cfg.launcher, PathBuf::from(DEFAULT_LAUNCHER));
        assert_eq!(cfg.grace_period, Duration::from_millis(500));
        assert_eq!(cfg.default_timeout, DEFAULT_TIMEOUT);
        assert_eq!(cfg.start_timeout, DEFAULT_START_TIMEOUT);
    }

    #[test]
    fn negative_durations_are_rejected() {
        let parsed: Result<ExecutorConfig, _> =
            serde_json::from_str(r#"{ "default_timeout_secs": -1 }"#);
        assert!(parsed.is_err());
    }
}
