// ABOUTME: Command module aggregator for the releasekit CLI.
// ABOUTME: Re-exports deploy, rollback, status, and prune command handlers.

mod deploy;
mod prune;
mod rollback;
mod status;

pub use deploy::deploy;
pub use prune::prune;
pub use rollback::rollback;
pub use status::status;

use releasekit::config::Config;
use releasekit::service::SystemctlController;

/// Service controller for the configured systemd instance.
fn service_controller(config: &Config) -> SystemctlController {
    SystemctlController::new().user(config.systemd_user)
}
