// ABOUTME: Library root for releasekit - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod health;
pub mod hooks;
pub mod output;
pub mod release;
pub mod service;
pub mod stager;
pub mod types;
