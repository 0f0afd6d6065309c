//! CLI argument definitions for vhdpatch.
//!
//! Kept out of `main.rs` so [`RunConfig::from_cli`](crate::config::RunConfig::from_cli)
//! and the integration tests can reference the parsed type.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "vhdpatch")]
#[command(about = "Apply approved WSUS updates to an offline virtual disk image")]
#[command(version)]
pub struct Cli {
    /// Virtual disk image to service (.vhd, .vhdx or .wim)
    #[arg(long, env = "VHDPATCH_IMAGE")]
    pub image: PathBuf,

    /// Existing directory the image is mounted into
    #[arg(long, env = "VHDPATCH_MOUNT_DIR")]
    pub mount_dir: PathBuf,

    /// WSUS server host name
    #[arg(long, env = "VHDPATCH_SERVER")]
    pub server: String,

    /// Local WSUS content directory (the folder behind the server's /Content share)
    #[arg(long, env = "VHDPATCH_CONTENT")]
    pub content: PathBuf,

    /// WSUS server port
    #[arg(long, env = "VHDPATCH_PORT", default_value_t = 8530)]
    pub port: u16,

    /// Connect to the WSUS server over TLS
    #[arg(long, env = "VHDPATCH_SSL")]
    pub ssl: bool,

    /// Only use updates approved for this computer target group
    #[arg(long, env = "VHDPATCH_TARGET_GROUP")]
    pub target_group: Option<String>,

    /// Run log (truncated at start) [default: <temp dir>/vhdpatch.log]
    #[arg(long, env = "VHDPATCH_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Ask before applying packages to the mounted image
    #[arg(long)]
    pub confirm: bool,

    /// Unmount discarding all changes instead of committing them
    #[arg(long)]
    pub discard: bool,

    /// Resolve updates and list packages without touching the image
    #[arg(long, short = 'n')]
    pub dry_run: bool,

    /// Write a JSON servicing report to this path
    #[arg(long, env = "VHDPATCH_REPORT")]
    pub report: Option<PathBuf>,

    /// Path to the DISM executable
    #[arg(long, env = "VHDPATCH_DISM", default_value = "dism.exe")]
    pub dism: String,

    /// Path to Microsoft.UpdateServices.Administration.dll
    #[arg(long, env = "VHDPATCH_ADMIN_LIBRARY")]
    pub admin_library: Option<PathBuf>,

    /// Seconds to wait when the image is already mounted
    #[arg(long, env = "VHDPATCH_GRACE_PERIOD", default_value_t = 10)]
    pub grace_period: u64,

    /// Log progress details
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Log debug details (implies --verbose)
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from([
            "vhdpatch",
            "--image",
            "base.vhdx",
            "--mount-dir",
            "mnt",
            "--server",
            "wsus01",
            "--content",
            "content",
        ])
        .unwrap();
        assert_eq!(cli.port, 8530);
        assert_eq!(cli.grace_period, 10);
        assert_eq!(cli.dism, "dism.exe");
        assert!(cli.target_group.is_none());
        assert!(!cli.confirm && !cli.discard && !cli.dry_run);
    }

    #[test]
    fn test_missing_required_argument_fails() {
        let err = Cli::try_parse_from(["vhdpatch", "--image", "base.vhdx"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
