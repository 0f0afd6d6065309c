//! Parsers for DISM's line-oriented text output.
//!
//! DISM has no machine-readable output for these commands, so the exact
//! marker lines below are the contract. Lines are compared whole, with only
//! the line terminator removed.

use std::path::Path;

use serde::Serialize;

use crate::command_runner::ToolOutput;

pub const APPLICABLE: &str = "Applicable : Yes";
/// Present with an empty value when DISM has no install timestamp.
pub const INSTALL_TIME_EMPTY: &str = "Install Time : ";
pub const OFFLINE_CAPABLE: &str = "Completely offline capable : Yes";
pub const OPERATION_SUCCEEDED: &str = "The operation completed successfully.";

const MOUNT_DIR_PREFIX: &str = "Mount Dir :";

/// Classification of one package against the mounted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageApplicability {
    NotApplicable,
    AlreadyInstalled,
    NotOfflineCapable,
    Pending,
}

impl PackageApplicability {
    /// Classify `/Get-PackageInfo` output. Checks run in this order:
    ///
    /// 1. no `Applicable : Yes` line: [`NotApplicable`](Self::NotApplicable)
    /// 2. no empty `Install Time : ` line: [`AlreadyInstalled`](Self::AlreadyInstalled)
    /// 3. no `Completely offline capable : Yes` line: [`NotOfflineCapable`](Self::NotOfflineCapable)
    /// 4. otherwise [`Pending`](Self::Pending)
    ///
    /// Step 2 treats a missing empty-install-time line as "installed". That
    /// is the long-standing behavior of this check; a package whose info
    /// omits the field entirely is therefore never applied.
    pub fn classify(info: &ToolOutput) -> Self {
        if !info.has_line(APPLICABLE) {
            PackageApplicability::NotApplicable
        } else if !info.has_line(INSTALL_TIME_EMPTY) {
            PackageApplicability::AlreadyInstalled
        } else if !info.has_line(OFFLINE_CAPABLE) {
            PackageApplicability::NotOfflineCapable
        } else {
            PackageApplicability::Pending
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            PackageApplicability::NotApplicable => "not applicable",
            PackageApplicability::AlreadyInstalled => "already installed",
            PackageApplicability::NotOfflineCapable => "not offline capable",
            PackageApplicability::Pending => "pending",
        }
    }
}

/// True if an `/Add-Package` or `/Unmount-Image` run reported success.
pub fn operation_succeeded(output: &ToolOutput) -> bool {
    output.has_line(OPERATION_SUCCEEDED)
}

/// True if `/Get-MountedImageInfo` output lists `mount_dir`.
///
/// Windows paths compare case-insensitively; trailing separators are ignored.
pub fn lists_mount_dir(output: &ToolOutput, mount_dir: &Path) -> bool {
    let wanted = mount_dir.to_string_lossy();
    let wanted = trim_separators(&wanted);
    output
        .stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix(MOUNT_DIR_PREFIX))
        .any(|dir| trim_separators(dir.trim()).eq_ignore_ascii_case(wanted))
}

fn trim_separators(path: &str) -> &str {
    path.trim_end_matches(['\\', '/'])
}
