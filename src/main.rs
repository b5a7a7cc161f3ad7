// ABOUTME: Entry point for the releasekit CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use std::env;
use std::path::PathBuf;

use clap::Parser;
use cli::{Cli, Commands};
use releasekit::config::{self, Config};
use releasekit::error::Result;
use releasekit::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.output;
    if let Err(e) = run(cli).await {
        Output::new(mode).failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(cli.output);

    match cli.command {
        Commands::Init { app, path, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, app.as_deref(), path.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Deploy {
            version,
            artifact,
            check,
            force,
        } => {
            let config = load_config(cli.config)?.with_overrides(version, artifact);
            commands::deploy(config, check, force, output).await
        }
        Commands::Rollback { force } => {
            let config = load_config(cli.config)?;
            commands::rollback(config, force, output).await
        }
        Commands::Status => {
            let config = load_config(cli.config)?;
            commands::status(&config, &output)
        }
        Commands::Prune { force } => {
            let config = load_config(cli.config)?;
            commands::prune(&config, force, &output)
        }
    }
}

/// Load an explicit config file, or discover one in the working directory.
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(&path),
        None => Config::discover(&env::current_dir()?),
    }
}
