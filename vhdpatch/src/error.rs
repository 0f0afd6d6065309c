//! Fatal error taxonomy for vhdpatch.
//!
//! Anything in [`PatchError`] halts the run. Per-package problems are not
//! errors; they are recorded as [`PackageOutcome`](crate::report::PackageOutcome)
//! values and the servicing loop continues.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{what} not found: {}", path.display())]
    MissingPath { what: &'static str, path: PathBuf },

    #[error(
        "WSUS administration library not found at {}; install the WSUS administration console",
        path.display()
    )]
    MissingAdminLibrary { path: PathBuf },

    #[error("Target group not found on the update server: '{name}'")]
    GroupNotFound { name: String },

    #[error("Update server query failed: {message}")]
    UpdateQuery { message: String },

    #[error("Failed to mount {} at {}", image.display(), mount_dir.display())]
    MountFailed { image: PathBuf, mount_dir: PathBuf },

    #[error("Failed to unmount {} ({mode})", mount_dir.display())]
    UnmountFailed {
        mount_dir: PathBuf,
        mode: &'static str,
    },

    #[error("Failed to run '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Log file error at {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
