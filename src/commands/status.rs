// ABOUTME: Status command implementation.
// ABOUTME: Shows the current release and every staged release, newest first.

use serde::Serialize;

use releasekit::config::Config;
use releasekit::error::Result;
use releasekit::output::{Output, OutputMode};
use releasekit::release::{CurrentPointer, Release, ReleaseStore};
use releasekit::types::{AppName, Version};

#[derive(Serialize)]
struct StatusReport<'a> {
    app: &'a AppName,
    app_path: String,
    current: Option<Version>,
    releases: Vec<ReleaseEntry<'a>>,
}

#[derive(Serialize)]
struct ReleaseEntry<'a> {
    #[serde(flatten)]
    release: &'a Release,
    current: bool,
}

pub fn status(config: &Config, output: &Output) -> Result<()> {
    let pointer = CurrentPointer::new(&config.app_path);
    let store = ReleaseStore::new(&config.app_path);

    let current = pointer.read()?;
    let releases = store.list()?;

    match output.mode() {
        OutputMode::Json => {
            let report = StatusReport {
                app: &config.app_name,
                app_path: config.app_path.display().to_string(),
                current: current.clone(),
                releases: releases
                    .iter()
                    .map(|release| ReleaseEntry {
                        release,
                        current: current.as_ref() == Some(&release.version),
                    })
                    .collect(),
            };
            output.json(&report);
        }
        OutputMode::Quiet => {
            if let Some(version) = &current {
                println!("{version}");
            }
        }
        OutputMode::Normal => {
            println!("App: {}", config.app_name);
            println!("Path: {}", config.app_path.display());
            match (&current, pointer.target()?) {
                (Some(version), Some(target)) => {
                    println!("Current: {} -> {}", version, target.display())
                }
                _ => println!("Current: none"),
            }

            if releases.is_empty() {
                println!("Releases: none");
            } else {
                println!("Releases:");
                for release in &releases {
                    let marker = if current.as_ref() == Some(&release.version) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        "  {} {}  {}",
                        marker,
                        release.version,
                        release.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
        }
    }

    Ok(())
}
