// ABOUTME: Prune command implementation.
// ABOUTME: Runs the retention policy on its own, protecting the current release.

use releasekit::config::Config;
use releasekit::deploy::DeployLock;
use releasekit::diagnostics::{Diagnostics, Warning};
use releasekit::error::Result;
use releasekit::output::{Output, OutputMode};
use releasekit::release::{CurrentPointer, ReleaseStore, RetentionPolicy};

pub fn prune(config: &Config, force: bool, output: &Output) -> Result<()> {
    let lock = DeployLock::acquire(&config.app_path, &config.app_name, force)?;
    let mut diag = Diagnostics::default();

    let store = ReleaseStore::new(&config.app_path);
    let protected = CurrentPointer::new(&config.app_path).read()?;
    let report = RetentionPolicy::new(config.keep_versions).prune(&store, protected.as_ref());

    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(e.to_string()));
    }

    let report = report?;
    for failure in &report.failed {
        diag.warn(Warning::cleanup(format!(
            "failed to remove release {}: {}",
            failure.version, failure.error
        )));
    }

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    if output.mode() == OutputMode::Json {
        output.json(&report);
    } else {
        output.success(&format!(
            "Pruned {} release(s), kept {}",
            report.removed.len(),
            report.kept.len()
        ));
    }

    Ok(())
}
