// ABOUTME: Deploy command implementation.
// ABOUTME: Handles the deploy lock, hooks, and running the orchestrator.

use releasekit::config::Config;
use releasekit::deploy::{DeployLock, Orchestrator, Outcome};
use releasekit::diagnostics::{Diagnostics, Warning};
use releasekit::error::{Error, Result};
use releasekit::health::HttpProbe;
use releasekit::hooks::{HookContext, HookPoint, HookRunner};
use releasekit::output::{Output, OutputMode};
use releasekit::stager::CommandStager;

use super::service_controller;

/// Deploy the configured version, or report what would happen with `check`.
pub async fn deploy(config: Config, check: bool, force: bool, mut output: Output) -> Result<()> {
    let options = config.deploy_options()?;
    let orchestrator = Orchestrator::new(
        &config.app_path,
        CommandStager::new(config.strip_components),
        service_controller(&config),
        HttpProbe::new(),
    );

    if check {
        let plan = orchestrator.plan(&options)?;
        output.json(&serde_json::json!({
            "event": "plan",
            "app": config.app_name,
            "target_version": plan.target,
            "current_version": plan.current,
            "would_change": plan.action.would_change(),
            "message": plan.to_string(),
        }));
        if output.mode() != OutputMode::Json {
            output.success(&plan.to_string());
        }
        return Ok(());
    }

    output.start_timer();
    let lock = DeployLock::acquire(&config.app_path, &config.app_name, force)?;
    let hook_runner = HookRunner::new(&config.app_path);
    let mut diag = Diagnostics::default();

    let previous = orchestrator.pointer().read()?;
    let context = HookContext::new(&config.app_name, &options.version, &config.app_path)
        .previous_version(previous);

    run_hook(&hook_runner, HookPoint::PreDeploy, &context, &output, &mut diag).await?;

    output.progress(&format!(
        "Deploying {} {} to {}",
        config.app_name,
        options.version,
        config.app_path.display()
    ));

    let result = orchestrator.deploy(options).await;
    let attempt = match &result {
        Ok(attempt) => attempt,
        Err(failure) => failure.attempt(),
    };

    let point = if attempt.outcome.is_success() {
        HookPoint::PostDeploy
    } else {
        HookPoint::OnError
    };
    let context = context.outcome(attempt.outcome);
    run_hook(&hook_runner, point, &context, &output, &mut diag).await?;

    output.attempt(attempt);

    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(e.to_string()));
    }

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    let attempt = result?;
    if attempt.outcome == Outcome::RolledBack
        && let Some(restored) = attempt.deployed_version
    {
        return Err(Error::RolledBack {
            target: attempt.target_version,
            restored,
        });
    }

    Ok(())
}

/// Run the hook for `point`. A failing fatal hook aborts; any other failure
/// becomes a warning.
async fn run_hook(
    runner: &HookRunner,
    point: HookPoint,
    context: &HookContext,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<()> {
    let Some(result) = runner.run(point, context).await else {
        return Ok(());
    };
    if result.success {
        return Ok(());
    }

    if point.is_fatal() {
        if !result.stderr.is_empty() {
            output.error(result.stderr.trim());
        }
        return Err(Error::Hook(format!("{} hook failed", point.filename())));
    }

    diag.warn(Warning::hook(format!(
        "{} hook failed: {}",
        point.filename(),
        result.stderr.trim()
    )));
    Ok(())
}
