// ABOUTME: Test support utilities.
// ABOUTME: In-process fakes for staging, service control, and probing, plus an app fixture.

// Each test binary only uses some of these helpers.
#![allow(dead_code)]

use std::collections::HashSet;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use releasekit::config::HealthcheckConfig;
use releasekit::deploy::{DeployOptions, Orchestrator};
use releasekit::health::{Probe, ProbeError};
use releasekit::release::{CurrentPointer, ReleaseStore};
use releasekit::service::{RestartError, ServiceController, ServiceSettings};
use releasekit::stager::{ArtifactStager, StagingError};
use releasekit::types::{AppName, KeepCount, Version};
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("releasekit=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// File written into every release the fakes stage.
pub const VERSION_FILE: &str = "VERSION";

pub fn version(s: &str) -> Version {
    Version::new(s).unwrap()
}

/// Stager that writes a VERSION file, failing for chosen versions.
#[derive(Default)]
pub struct FakeStager {
    pub failing: HashSet<String>,
    pub hang: bool,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeStager {
    pub fn failing_for(versions: &[&str]) -> Self {
        Self {
            failing: versions.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStager for FakeStager {
    async fn fetch(
        &self,
        version: &Version,
        _source: &str,
        dest: &Path,
    ) -> Result<(), StagingError> {
        self.fetched.lock().unwrap().push(version.to_string());

        if self.hang {
            std::future::pending::<()>().await;
        }

        // Leave a partial file behind so cleanup can be observed.
        fs::write(dest.join("partial"), b"...").unwrap();

        if self.failing.contains(version.as_str()) {
            return Err(StagingError::Stager {
                message: format!("download of {} failed", version),
            });
        }

        fs::write(dest.join(VERSION_FILE), version.as_str()).unwrap();
        Ok(())
    }
}

/// Service controller whose restart and activity results are scripted.
pub struct FakeController {
    pub restart_ok: AtomicBool,
    /// Number of upcoming restarts to fail before honouring `restart_ok`.
    pub fail_next: AtomicUsize,
    pub active: AtomicBool,
    pub restarts: AtomicUsize,
}

impl Default for FakeController {
    fn default() -> Self {
        Self {
            restart_ok: AtomicBool::new(true),
            fail_next: AtomicUsize::new(0),
            active: AtomicBool::new(true),
            restarts: AtomicUsize::new(0),
        }
    }
}

impl FakeController {
    pub fn failing() -> Self {
        let controller = Self::default();
        controller.restart_ok.store(false, Ordering::SeqCst);
        controller
    }

    pub fn failing_once() -> Self {
        let controller = Self::default();
        controller.fail_next.store(1, Ordering::SeqCst);
        controller
    }

    pub fn restart_count(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceController for FakeController {
    async fn restart(&self, service: &str) -> Result<(), RestartError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        let scripted_failure = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !scripted_failure && self.restart_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RestartError::Failed {
                service: service.to_string(),
                message: "unit failed to start".to_string(),
            })
        }
    }

    async fn is_active(&self, _service: &str) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Probe that passes only while `current` points at a healthy version.
pub struct FakeProbe {
    current_version_file: PathBuf,
    healthy: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn healthy(app_path: &Path, versions: &[&str]) -> Self {
        Self {
            current_version_file: app_path.join("current").join(VERSION_FILE),
            healthy: versions.iter().map(|v| v.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for FakeProbe {
    async fn check(&self, _url: &str) -> Result<(), ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let serving = fs::read_to_string(&self.current_version_file)
            .map_err(|e| ProbeError::Other(e.to_string()))?;

        if self.healthy.contains(serving.trim()) {
            Ok(())
        } else {
            Err(ProbeError::Status(503))
        }
    }
}

/// Whether a read-only directory actually refuses writes here.
///
/// Privileged users bypass directory permissions, so tests that rely on an
/// undeletable directory check this first.
pub fn write_protection_enforced() -> bool {
    let dir = tempfile::tempdir().unwrap();
    let sealed = dir.path().join("sealed");
    fs::create_dir(&sealed).unwrap();
    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o555)).unwrap();
    let refused = fs::write(sealed.join("file"), b"x").is_err();
    fs::set_permissions(&sealed, fs::Permissions::from_mode(0o755)).unwrap();
    refused
}

/// A temporary application directory.
pub struct AppFixture {
    _dir: TempDir,
    pub app_path: PathBuf,
}

impl AppFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let app_path = dir.path().join("app");
        fs::create_dir_all(&app_path).unwrap();
        Self {
            _dir: dir,
            app_path,
        }
    }

    pub fn store(&self) -> ReleaseStore {
        ReleaseStore::new(&self.app_path)
    }

    pub fn pointer(&self) -> CurrentPointer {
        CurrentPointer::new(&self.app_path)
    }

    /// Create a staged release whose mtime is `age` in the past.
    pub fn stage_release(&self, name: &str, age: Duration) -> PathBuf {
        let dir = self.app_path.join("releases").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(VERSION_FILE), name).unwrap();
        let mtime = SystemTime::now() - age;
        File::open(&dir).unwrap().set_modified(mtime).unwrap();
        dir
    }

    /// Stage releases oldest first, one minute apart.
    pub fn stage_releases(&self, names: &[&str]) {
        let count = names.len() as u64;
        for (i, name) in names.iter().enumerate() {
            let age = Duration::from_secs(60 * (count - i as u64));
            self.stage_release(name, age);
        }
    }

    pub fn point_current(&self, name: &str) {
        let release = self.store().release(&version(name)).unwrap().unwrap();
        self.pointer().switch_to(&release).unwrap();
    }

    pub fn current(&self) -> Option<String> {
        self.pointer().read().unwrap().map(|v| v.to_string())
    }

    pub fn release_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .store()
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.version.to_string())
            .collect();
        names.sort();
        names
    }

    /// Options with short timeouts, a health URL, and a service to restart.
    pub fn options(&self, target: &str) -> DeployOptions {
        let mut options = DeployOptions::new(AppName::new("demo").unwrap(), version(target));
        options.artifact_source = Some(format!("https://releases.example.com/{target}.tar.gz"));
        options.healthcheck = HealthcheckConfig {
            url: Some("http://127.0.0.1:9/health".to_string()),
            timeout: Duration::from_millis(300),
            poll_interval: Duration::from_millis(20),
            request_timeout: Duration::from_millis(50),
        };
        options.keep_versions = KeepCount::new(5).unwrap();
        options.service = Some(ServiceSettings {
            name: "demo".to_string(),
            restart_timeout: Duration::from_secs(1),
            settle: Duration::ZERO,
        });
        options.staging_timeout = Duration::from_secs(5);
        options
    }

    pub fn orchestrator<'a>(
        &self,
        stager: &'a FakeStager,
        controller: &'a FakeController,
        probe: &'a FakeProbe,
    ) -> Orchestrator<&'a FakeStager, &'a FakeController, &'a FakeProbe> {
        Orchestrator::new(&self.app_path, stager, controller, probe)
    }
}
