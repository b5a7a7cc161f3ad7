// ABOUTME: Integration tests for the releasekit CLI commands.
// ABOUTME: Runs the binary against temporary app directories with local artifacts.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn releasekit_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("releasekit"))
}

/// A project directory with a config whose app lives in `./app`.
struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        project.keep_versions(5);
        project
    }

    fn keep_versions(&self, keep: usize) {
        fs::write(
            self.path().join("releasekit.yml"),
            format!("app_name: demo\napp_path: app\nkeep_versions: {keep}\n"),
        )
        .unwrap();
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn app_path(&self) -> PathBuf {
        self.path().join("app")
    }

    /// A local artifact directory for `version`.
    fn artifact(&self, version: &str) -> PathBuf {
        let dir = self.path().join("artifacts").join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("VERSION"), version).unwrap();
        dir
    }

    fn hook(&self, name: &str, body: &str) {
        let hooks = self.app_path().join("hooks");
        fs::create_dir_all(&hooks).unwrap();
        let path = hooks.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = releasekit_cmd();
        cmd.current_dir(self.path());
        cmd
    }

    fn deploy(&self, version: &str) -> assert_cmd::assert::Assert {
        let artifact = self.artifact(version);
        self.cmd()
            .args(["deploy", "--version", version, "--artifact"])
            .arg(&artifact)
            .assert()
    }

    fn current(&self) -> String {
        fs::read_to_string(self.app_path().join("current/VERSION")).unwrap()
    }
}

#[test]
fn help_shows_commands() {
    releasekit_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("prune"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("releasekit.yml");

    releasekit_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--app", "shop"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("app_name: shop"));
    assert!(content.contains("health_check_url:"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("releasekit.yml"), "existing: config").unwrap();

    releasekit_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn missing_config_is_an_error() {
    let temp_dir = tempfile::tempdir().unwrap();

    releasekit_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn deploy_without_version_is_an_error() {
    let project = Project::new();

    project
        .cmd()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no version to deploy"));
}

#[test]
fn deploy_local_artifact_and_redeploy_idempotently() {
    let project = Project::new();

    project
        .deploy("1.0")
        .success()
        .stdout(predicate::str::contains("No health check URL provided"));
    assert_eq!(project.current(), "1.0");
    assert!(!project.app_path().join(".releasekit.lock").exists());

    project
        .deploy("1.0")
        .success()
        .stdout(predicate::str::contains("Already deployed"));
}

#[test]
fn deploy_json_reports_attempt() {
    let project = Project::new();
    project.deploy("1.0").success();

    let artifact = project.artifact("2.0");
    let assert = project
        .cmd()
        .args(["--output", "json", "deploy", "--version", "2.0", "--artifact"])
        .arg(&artifact)
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let attempt: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(attempt["outcome"], "succeeded");
    assert_eq!(attempt["previous_version"], "1.0");
    assert_eq!(attempt["deployed_version"], "2.0");
    assert_eq!(attempt["changed"], true);
    assert_eq!(attempt["rollback_occurred"], false);
}

#[test]
fn check_mode_changes_nothing() {
    let project = Project::new();
    let artifact = project.artifact("1.0");

    project
        .cmd()
        .args(["deploy", "--check", "--version", "1.0", "--artifact"])
        .arg(&artifact)
        .assert()
        .success()
        .stdout(predicate::str::contains("would stage 1.0 from"));

    assert!(!project.app_path().join("releases").exists());
    assert!(!project.app_path().join("current").exists());
}

#[test]
fn post_deploy_hook_sees_outcome() {
    let project = Project::new();
    project.hook(
        "post-deploy",
        "echo \"$RELEASEKIT_VERSION $RELEASEKIT_OUTCOME\" > hook.out",
    );

    project.deploy("1.0").success();

    let recorded = fs::read_to_string(project.app_path().join("hook.out")).unwrap();
    assert_eq!(recorded.trim(), "1.0 succeeded");
}

#[test]
fn failing_pre_deploy_hook_aborts() {
    let project = Project::new();
    project.hook("pre-deploy", "echo 'not today' >&2\nexit 1");

    project
        .deploy("1.0")
        .failure()
        .stderr(predicate::str::contains("pre-deploy hook failed"));

    assert!(!project.app_path().join("releases/1.0").exists());
    assert!(!project.app_path().join(".releasekit.lock").exists());
}

#[test]
fn json_error_reports_lock_holder() {
    let project = Project::new();
    fs::create_dir_all(project.app_path()).unwrap();
    let lock = serde_json::json!({
        "holder": "build-07",
        "pid": 4242,
        "started_at": chrono::Utc::now().to_rfc3339(),
        "app": "demo",
    });
    fs::write(project.app_path().join(".releasekit.lock"), lock.to_string()).unwrap();

    let artifact = project.artifact("1.0");
    let assert = project
        .cmd()
        .args(["--output", "json", "deploy", "--version", "1.0", "--artifact"])
        .arg(&artifact)
        .assert()
        .failure();

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    let line = stderr
        .lines()
        .find(|line| line.starts_with('{'))
        .expect("no JSON error event");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["event"], "error");
    assert_eq!(event["kind"], "lock_held");
    assert_eq!(event["lock_holder"]["holder"], "build-07");
    assert_eq!(event["lock_holder"]["pid"], 4242);
    assert!(!project.app_path().join("releases/1.0").exists());
}

#[test]
fn failing_post_deploy_hook_only_warns() {
    let project = Project::new();
    project.hook("post-deploy", "echo 'notify failed' >&2\nexit 1");

    let artifact = project.artifact("1.0");
    project
        .cmd()
        .args(["--output", "quiet", "deploy", "--version", "1.0", "--artifact"])
        .arg(&artifact)
        .assert()
        .success()
        .stderr(predicate::str::contains("post-deploy hook failed: notify failed"));
    assert_eq!(project.current(), "1.0");
}

#[test]
fn rollback_restores_previous_release() {
    let project = Project::new();
    project.deploy("1.0").success();
    project.deploy("2.0").success();

    project
        .cmd()
        .arg("rollback")
        .assert()
        .success()
        .stdout(predicate::str::contains("from 2.0 to 1.0"));
    assert_eq!(project.current(), "1.0");
}

#[test]
fn status_lists_releases() {
    let project = Project::new();
    project.deploy("1.0").success();

    project
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current: 1.0"))
        .stdout(predicate::str::contains("* 1.0"));

    project
        .cmd()
        .args(["--output", "quiet", "status"])
        .assert()
        .success()
        .stdout("1.0\n");

    let assert = project
        .cmd()
        .args(["--output", "json", "status"])
        .assert()
        .success();
    let report: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["current"], "1.0");
    assert_eq!(report["releases"][0]["version"], "1.0");
    assert_eq!(report["releases"][0]["current"], true);
}

#[test]
fn prune_protects_current_release() {
    let project = Project::new();
    for version in ["1.0", "2.0", "3.0"] {
        project.deploy(version).success();
    }
    project.cmd().arg("rollback").assert().success();
    project.cmd().arg("rollback").assert().success();
    assert_eq!(project.current(), "1.0");

    project.keep_versions(1);
    project
        .cmd()
        .arg("prune")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pruned 1 release(s), kept 2"));

    let mut remaining: Vec<String> = fs::read_dir(project.app_path().join("releases"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["1.0", "3.0"]);
    assert_eq!(project.current(), "1.0");
}
