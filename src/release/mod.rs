// ABOUTME: On-disk release layout: staged versions, the current pointer, and retention.
// ABOUTME: Releases live in <app_path>/releases/<version>, the pointer at <app_path>/current.

mod pointer;
mod retention;
mod store;

pub use pointer::{CurrentPointer, PointerError, SwitchError};
pub use retention::{PruneFailure, PruneReport, RetentionPolicy, plan_prune};
pub use store::{Release, ReleaseError, ReleaseStore, Staged};

/// Directory under the application root holding one directory per release.
pub const RELEASES_DIR: &str = "releases";

/// Name of the symlink naming the active release.
pub const CURRENT_LINK: &str = "current";
