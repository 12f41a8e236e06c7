#![cfg(unix)]

mod common;

use common::Fixture;
use jobexec::{Error, JobRequest, JobStatus, ValidationError};
use std::time::Duration;

#[tokio::test]
async fn zero_exit_succeeds() {
    let fx = Fixture::new();
    let target = fx.script("ok.sh", "echo 'PLAY RECAP'\n");

    let result = fx.executor.execute(JobRequest::new(target), None, None).await;

    assert_eq!(result.status, JobStatus::Succeeded);
    assert_eq!(result.return_code, Some(0));
    assert_eq!(result.stdout.as_deref(), Some("PLAY RECAP\n"));
    assert_eq!(result.details.as_deref(), Some("All tasks completed without errors"));
    assert!(result.error.is_none());

    let api = result.to_api();
    assert_eq!(api.stdout, None);
    assert_eq!(api.stderr, None);
}

#[tokio::test]
async fn non_zero_exit_fails_with_stderr() {
    let fx = Fixture::new();
    let target = fx.script("fail.sh", "echo partial\necho 'fatal: host unreachable' >&2\nexit 3\n");

    let result = fx.executor.execute(JobRequest::new(target), None, None).await;

    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.return_code, Some(3));
    assert_eq!(result.message, "Job execution failed");
    assert_eq!(result.details.as_deref(), Some("fatal: host unreachable\n"));
    assert_eq!(
        result.error,
        Some(Error::NonZeroExit {
            code: Some(3),
            signal: None
        })
    );

    let api = result.to_api();
    assert_eq!(api.stdout.as_deref(), Some("partial\n"));
    assert_eq!(api.stderr.as_deref(), Some("fatal: host unreachable\n"));
    assert_eq!(api.return_code, Some(3));
}

#[tokio::test]
async fn silent_failure_gets_generic_detail() {
    let fx = Fixture::new();
    let target = fx.script("quiet.sh", "exit 1\n");

    let result = fx.executor.execute(JobRequest::new(target), None, None).await;

    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.details.as_deref(), Some("Unknown error occurred"));
}

#[tokio::test]
async fn extra_vars_reach_the_process_in_order() {
    let fx = Fixture::new();
    let target = fx.script("args.sh", "for arg in \"$@\"; do echo \"$arg\"; done\n");
    let request = JobRequest::new(target).extra_vars([("domain", "example.com"), ("env", "prod")]);

    let result = fx.executor.execute(request, None, None).await;

    assert_eq!(result.status, JobStatus::Succeeded);
    assert_eq!(
        result.stdout.as_deref(),
        Some("--extra-vars\ndomain=example.com\n--extra-vars\nenv=prod\n")
    );
}

#[tokio::test]
async fn environment_overlay_wins_over_inherited() {
    let fx = Fixture::new();
    let target = fx.script("env.sh", "printf '%s|%s' \"$JOBEXEC_OVERLAY\" \"$HOME\"\n");
    let request = JobRequest::new(target)
        .env("JOBEXEC_OVERLAY", "yes")
        .env("HOME", "/overlay-home");

    let result = fx.executor.execute(request, None, None).await;

    assert_eq!(result.stdout.as_deref(), Some("yes|/overlay-home"));
}

#[tokio::test]
async fn runs_in_requested_working_dir() {
    let fx = Fixture::new();
    std::fs::create_dir(fx.path("inventory")).expect("mkdir");
    let target = fx.script("pwd.sh", "pwd -P\n");

    let default_dir = fx.executor.execute(JobRequest::new(&target), None, None).await;
    let sub_dir = fx
        .executor
        .execute(JobRequest::new(&target).working_dir("inventory"), None, None)
        .await;

    let root = std::fs::canonicalize(fx.root.path()).expect("canonical root");
    assert_eq!(
        default_dir.stdout.as_deref().map(str::trim),
        Some(root.to_str().expect("utf-8 path"))
    );
    assert!(sub_dir
        .stdout
        .as_deref()
        .map(str::trim)
        .is_some_and(|dir| dir.ends_with("/inventory")));
}

#[tokio::test]
async fn missing_target_spawns_nothing() {
    let fx = Fixture::new();
    let marker = fx.path("launched");
    let launcher = fx.executable(
        "launcher.sh",
        &format!("#!/bin/sh\ntouch '{}'\n", marker.display()),
    );
    let fx = {
        let config = Fixture::config(fx.root.path()).with_launcher(&launcher);
        fx.with_config(config)
    };

    let err = fx.executor.submit(JobRequest::new("missing.yml")).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::TargetNotFound(_))
    ));

    let result = fx.executor.execute(JobRequest::new("missing.yml"), None, None).await;
    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.message, "Playbook not found");
    assert_eq!(result.return_code, None);
    assert_eq!(result.stdout, None);
    assert!(!marker.exists());

    // the same launcher does run for a target that exists
    let target = fx.script("site.yml", "");
    let result = fx.executor.execute(JobRequest::new(target), None, None).await;
    assert_eq!(result.status, JobStatus::Succeeded);
    assert!(marker.exists());
}

#[tokio::test]
async fn traversal_outside_root_is_rejected() {
    let fx = Fixture::new();
    std::fs::create_dir(fx.path("playbooks")).expect("mkdir");
    fx.script("secret.sh", "echo leaked\n");
    let fx = {
        let config = Fixture::config(&fx.path("playbooks"));
        fx.with_config(config)
    };

    let result = fx
        .executor
        .execute(JobRequest::new("../secret.sh"), None, None)
        .await;

    assert_eq!(result.status, JobStatus::Failed);
    assert!(matches!(
        result.error,
        Some(Error::Validation(ValidationError::OutsideAllowedRoot { .. }))
    ));
    assert_eq!(result.stdout, None);
}

#[tokio::test]
async fn missing_launcher_fails_without_spawning() {
    let fx = Fixture::new();
    let target = fx.script("ok.sh", "echo hi\n");
    let fx = {
        let config = Fixture::config(fx.root.path()).with_launcher("/nonexistent/ansible-playbook");
        fx.with_config(config)
    };

    let result = fx.executor.execute(JobRequest::new(target), None, None).await;

    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.message, "Launcher not found");
    assert_eq!(result.return_code, None);
}

#[tokio::test]
async fn unexecutable_launcher_is_a_spawn_failure() {
    let fx = Fixture::new();
    let target = fx.script("ok.sh", "echo hi\n");
    let launcher = fx.path("not-executable");
    std::fs::write(&launcher, "#!/bin/sh\n").expect("write launcher");
    let fx = {
        let config = Fixture::config(fx.root.path()).with_launcher(&launcher);
        fx.with_config(config)
    };

    let result = fx.executor.execute(JobRequest::new(target), None, None).await;

    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.message, "Job failed to start");
    assert!(matches!(result.error, Some(Error::Spawn(_))));
    assert_eq!(result.stdout, None);
}

#[tokio::test]
async fn concurrent_jobs_are_independent() {
    let fx = Fixture::new();
    let slow = fx.script("slow.sh", "sleep 0.3\necho slow\n");
    let broken = fx.script("broken.sh", "echo broken >&2\nexit 7\n");

    let (slow, broken) = tokio::join!(
        fx.executor
            .execute(JobRequest::new(slow).timeout(Duration::from_secs(10)), None, None),
        fx.executor.execute(JobRequest::new(broken), None, None),
    );

    assert_eq!(slow.status, JobStatus::Succeeded);
    assert_eq!(slow.stdout.as_deref(), Some("slow\n"));
    assert_eq!(broken.status, JobStatus::Failed);
    assert_eq!(broken.return_code, Some(7));
    assert_ne!(slow.job_id, broken.job_id);
}
