// ABOUTME: Validated domain types.
// ABOUTME: Application names, release versions, and retention counts.

mod app_name;
mod keep_count;
mod version;

pub use app_name::{AppName, AppNameError};
pub use keep_count::{KeepCount, KeepCountError};
pub use version::{Version, VersionError};
