// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use releasekit::output::OutputMode;
use releasekit::types::Version;

#[derive(Parser)]
#[command(name = "releasekit")]
#[command(about = "Versioned release deployment with automatic rollback")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputMode::Normal, global = true)]
    pub output: OutputMode,

    /// Path to the config file (default: discover in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new releasekit.yml configuration file
    Init {
        /// Application name
        #[arg(long)]
        app: Option<String>,

        /// Application directory holding releases/ and current
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Deploy a version, rolling back if it does not come up healthy
    Deploy {
        /// Version to deploy (overrides `version` in the config)
        #[arg(long)]
        version: Option<Version>,

        /// Artifact URL or local path (overrides `artifact_source`)
        #[arg(long)]
        artifact: Option<String>,

        /// Report what would happen without changing anything
        #[arg(long)]
        check: bool,

        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },

    /// Point current back at the previous release
    Rollback {
        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },

    /// Show the current release and staged releases
    Status,

    /// Remove releases beyond keep_versions
    Prune {
        /// Break an existing deploy lock
        #[arg(short, long)]
        force: bool,
    },
}
