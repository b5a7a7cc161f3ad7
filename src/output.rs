// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

use crate::deploy::{DeploymentAttempt, LockHolderInfo, Outcome};
use crate::error::Error;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    #[default]
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => self.event("success", message, false),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.event("warning", message, true),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.event("error", message, true),
        }
    }

    /// Report the error that ended the command. JSON output carries its kind
    /// and, for lock contention, who holds the lock.
    pub fn failure(&self, error: &Error) {
        if self.mode != OutputMode::Json {
            self.error(&error.to_string());
            return;
        }
        let message = error.to_string();
        let holder = error.lock_holder_info();
        let event = JsonEvent {
            event: "error",
            message: &message,
            duration_secs: self.duration(),
            kind: Some(error.kind()),
            lock_holder: holder.as_ref(),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            eprintln!("{json}");
        }
    }

    /// Print the record of a deployment run.
    pub fn attempt(&self, attempt: &DeploymentAttempt) {
        if self.mode == OutputMode::Json {
            self.json(attempt);
            return;
        }
        let (stdout, stderr) = self.attempt_lines(attempt);
        for line in stdout {
            println!("{line}");
        }
        for line in stderr {
            eprintln!("{line}");
        }
    }

    /// Stdout and stderr lines for a run record in the text modes.
    /// Warnings go to stderr in both, so quiet mode never hides them.
    fn attempt_lines(&self, attempt: &DeploymentAttempt) -> (Vec<String>, Vec<String>) {
        let mut stdout = Vec::new();
        if self.mode == OutputMode::Quiet {
            stdout.push(attempt.status.clone());
        } else {
            let verb = match attempt.outcome {
                Outcome::AlreadyDeployed | Outcome::Succeeded => "✓",
                _ => "✗",
            };
            stdout.push(format!(
                "{verb} {} {}: {} ({:.1}s)",
                attempt.app, attempt.target_version, attempt.status, attempt.duration_seconds
            ));
            if let Some(deployed) = &attempt.deployed_version {
                stdout.push(format!("  current: {deployed}"));
            }
            if !attempt.pruned.is_empty() {
                let pruned: Vec<_> = attempt.pruned.iter().map(|v| v.as_str()).collect();
                stdout.push(format!("  pruned: {}", pruned.join(", ")));
            }
        }
        let stderr = attempt
            .warnings
            .iter()
            .map(|warning| format!("Warning: {warning}"))
            .collect();
        (stdout, stderr)
    }

    /// Print any serializable value as a single JSON line (JSON mode only).
    pub fn json<T: Serialize>(&self, value: &T) {
        if self.mode == OutputMode::Json
            && let Ok(json) = serde_json::to_string(value)
        {
            println!("{json}");
        }
    }

    fn event(&self, event: &str, message: &str, stderr: bool) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: self.duration(),
            kind: None,
            lock_holder: None,
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lock_holder: Option<&'a LockHolderInfo>,
}
