//! Immutable run configuration.
//!
//! Everything a run needs is resolved once from the CLI into [`RunConfig`]
//! and passed by reference to every stage. There are no global toggles.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;

/// Where the WSUS console installs its administration assembly, relative to
/// `%ProgramFiles%`.
const ADMIN_LIBRARY_RELATIVE: &str =
    r"Update Services\Api\Microsoft.UpdateServices.Administration.dll";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishMode {
    Commit,
    Discard,
}

impl FinishMode {
    /// The DISM `/Unmount-Image` switch for this mode.
    pub fn dism_switch(self) -> &'static str {
        match self {
            FinishMode::Commit => "/Commit",
            FinishMode::Discard => "/Discard",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub image: PathBuf,
    pub mount_dir: PathBuf,
    pub content_root: PathBuf,
    pub server: String,
    pub port: u16,
    pub use_ssl: bool,
    pub target_group: Option<String>,
    pub log_file: PathBuf,
    pub report: Option<PathBuf>,
    pub dism: String,
    pub admin_library: PathBuf,
    /// Wait applied when the mount directory is already in use.
    pub grace_period: Duration,
    pub require_confirmation: bool,
    pub finish: FinishMode,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            image: absolute(&cli.image),
            mount_dir: absolute(&cli.mount_dir),
            content_root: cli.content.clone(),
            server: cli.server.clone(),
            port: cli.port,
            use_ssl: cli.ssl,
            target_group: cli.target_group.clone(),
            log_file: cli.log_file.clone().unwrap_or_else(default_log_file),
            report: cli.report.clone(),
            dism: cli.dism.clone(),
            admin_library: cli
                .admin_library
                .clone()
                .unwrap_or_else(default_admin_library),
            grace_period: Duration::from_secs(cli.grace_period),
            require_confirmation: cli.confirm,
            finish: if cli.discard {
                FinishMode::Discard
            } else {
                FinishMode::Commit
            },
            dry_run: cli.dry_run,
        }
    }
}

/// `path` made absolute against the working directory, or unchanged if the
/// working directory cannot be read. DISM reports mount directories in
/// absolute form.
pub fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("vhdpatch.log")
}

pub fn default_admin_library() -> PathBuf {
    let program_files = std::env::var_os("ProgramFiles")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Program Files"));
    program_files.join(ADMIN_LIBRARY_RELATIVE)
}

/// Builder for configs in tests; paths default under `root`.
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            config: RunConfig {
                image: root.join("image.vhdx"),
                mount_dir: root.join("mount"),
                content_root: root.join("WsusContent"),
                server: "wsus01".to_string(),
                port: 8530,
                use_ssl: false,
                target_group: None,
                log_file: root.join("vhdpatch.log"),
                report: None,
                dism: "dism.exe".to_string(),
                admin_library: root.join("Microsoft.UpdateServices.Administration.dll"),
                grace_period: Duration::ZERO,
                require_confirmation: false,
                finish: FinishMode::Commit,
                dry_run: false,
            },
        }
    }

    pub fn target_group(mut self, name: &str) -> Self {
        self.config.target_group = Some(name.to_string());
        self
    }

    pub fn require_confirmation(mut self, yes: bool) -> Self {
        self.config.require_confirmation = yes;
        self
    }

    pub fn finish(mut self, mode: FinishMode) -> Self {
        self.config.finish = mode;
        self
    }

    pub fn dry_run(mut self, yes: bool) -> Self {
        self.config.dry_run = yes;
        self
    }

    pub fn report(mut self, path: PathBuf) -> Self {
        self.config.report = Some(path);
        self
    }

    pub fn build(self) -> RunConfig {
        self.config
    }
}
