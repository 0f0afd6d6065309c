//! Precondition checks run before anything touches the image.
//!
//! Every check is evaluated and written to the run log, so one look at the
//! log shows all problems; the first failure becomes the returned error.

use std::path::PathBuf;

use crate::config::RunConfig;
use crate::error::PatchError;
use crate::run_log::RunLog;

struct Check {
    what: &'static str,
    path: PathBuf,
}

fn checks(config: &RunConfig) -> Vec<Check> {
    vec![
        Check {
            what: "Image file",
            path: config.image.clone(),
        },
        Check {
            what: "Mount directory",
            path: config.mount_dir.clone(),
        },
        Check {
            what: "Content directory",
            path: config.content_root.clone(),
        },
    ]
}

fn failure(check: &Check) -> PatchError {
    PatchError::MissingPath {
        what: check.what,
        path: check.path.clone(),
    }
}

/// Verify the configured paths and the WSUS administration library exist.
pub fn run(config: &RunConfig, log: &RunLog) -> Result<(), PatchError> {
    let mut errors: Vec<PatchError> = checks(config)
        .iter()
        .filter(|check| !check.path.exists())
        .map(failure)
        .collect();

    if !config.admin_library.is_file() {
        errors.push(PatchError::MissingAdminLibrary {
            path: config.admin_library.clone(),
        });
    }

    for err in &errors {
        log.note(format!("precondition failed: {err}"));
        tracing::warn!(%err, "precondition failed");
    }

    match errors.into_iter().next() {
        Some(first) => Err(first),
        None => {
            tracing::debug!(
                image = %config.image.display(),
                mount_dir = %config.mount_dir.display(),
                "preconditions satisfied"
            );
            Ok(())
        }
    }
}
