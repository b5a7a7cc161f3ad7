// ABOUTME: Rollback command implementation.
// ABOUTME: Points current back at the release staged before it and restarts the service.

use releasekit::config::Config;
use releasekit::deploy::{DeployError, DeployLock, manual_rollback};
use releasekit::diagnostics::{Diagnostics, Warning};
use releasekit::error::Result;
use releasekit::output::{Output, OutputMode};
use releasekit::release::{CurrentPointer, ReleaseStore};

use super::service_controller;

/// Roll back to the previous release.
pub async fn rollback(config: Config, force: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    let lock = DeployLock::acquire(&config.app_path, &config.app_name, force)?;
    let mut diag = Diagnostics::default();

    let store = ReleaseStore::new(&config.app_path);
    let pointer = CurrentPointer::new(&config.app_path);
    let controller = service_controller(&config);
    let service = config.service_settings();

    output.progress(&format!("Rolling back {}", config.app_name));
    let result = manual_rollback(&store, &pointer, &controller, service.as_ref()).await;

    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(e.to_string()));
    }

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    let rolled_back = result.map_err(DeployError::from)?;

    output.json(&serde_json::json!({
        "event": "rollback",
        "app": config.app_name,
        "from": rolled_back.from,
        "to": rolled_back.to,
    }));
    if output.mode() != OutputMode::Json {
        output.success(&format!(
            "Rolled back {} from {} to {}",
            config.app_name, rolled_back.from, rolled_back.to
        ));
    }
    Ok(())
}
