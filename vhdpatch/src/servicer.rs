//! Mounted-image lifecycle and the per-package apply loop.
//!
//! An [`ImageSession`] only exists while the image is mounted.
//! [`ImageSession::finish`] consumes it, so commit or discard happens exactly
//! once per session.

use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

use crate::config::{FinishMode, RunConfig, absolute};
use crate::content::Installables;
use crate::dism::{Dism, PackageApplicability, parse};
use crate::error::PatchError;
use crate::output::Output;
use crate::report::{PackageOutcome, ServicingReport};

pub struct ImageSession<'d, 'r> {
    dism: &'d Dism<'r>,
    mount_dir: PathBuf,
    log_file: PathBuf,
}

impl<'d, 'r> ImageSession<'d, 'r> {
    /// Session for a mount left in `config.mount_dir` by an earlier run, if
    /// there is one.
    pub fn existing(dism: &'d Dism<'r>, config: &RunConfig) -> Result<Option<Self>> {
        let session = Self::new(dism, config);
        if !dism.is_mounted(&session.mount_dir)? {
            return Ok(None);
        }
        Output::warning(format!(
            "{} is already mounted; reusing it in {}s",
            session.mount_dir.display(),
            config.grace_period.as_secs()
        ));
        std::thread::sleep(config.grace_period);
        Ok(Some(session))
    }

    /// Mount `config.image` unless the mount directory is already in use.
    ///
    /// An existing mount is reused after the grace period. A mount that does
    /// not show up in the mounted-image listing afterwards is fatal.
    pub fn mount(dism: &'d Dism<'r>, config: &RunConfig) -> Result<Self> {
        if let Some(session) = Self::existing(dism, config)? {
            return Ok(session);
        }
        let session = Self::new(dism, config);

        let spinner = Output::spinner(format!(
            "Mounting {} at {}...",
            config.image.display(),
            session.mount_dir.display()
        ));
        let output = match dism.mount(&config.image, &session.mount_dir) {
            Ok(output) => output,
            Err(err) => {
                spinner.finish_error("Mount failed");
                return Err(err);
            }
        };
        tracing::info!(success = output.success, code = ?output.code, "mount finished");

        if !dism.is_mounted(&session.mount_dir)? {
            spinner.finish_error("Mount failed");
            return Err(PatchError::MountFailed {
                image: config.image.clone(),
                mount_dir: session.mount_dir,
            }
            .into());
        }
        spinner.finish_success(format!("Mounted at {}", session.mount_dir.display()));
        Ok(session)
    }

    /// DISM lists mount directories as absolute paths, so the session keeps
    /// the absolute form.
    fn new(dism: &'d Dism<'r>, config: &RunConfig) -> Self {
        Self {
            dism,
            mount_dir: absolute(&config.mount_dir),
            log_file: config.log_file.clone(),
        }
    }

    pub fn mount_dir(&self) -> &Path {
        &self.mount_dir
    }

    /// Classify one package and add it if it is pending.
    ///
    /// Never fails: tool errors become [`PackageOutcome::Failed`].
    pub fn apply(&self, package: &Path, title: &str) -> PackageOutcome {
        let info = match self.dism.package_info(&self.mount_dir, package) {
            Ok(info) => info,
            Err(err) => {
                self.report_failure(title, &format!("{err:#}"));
                return PackageOutcome::Failed;
            }
        };

        match PackageApplicability::classify(&info) {
            PackageApplicability::Pending => {}
            PackageApplicability::NotOfflineCapable => {
                Output::warning(format!("{title} cannot be applied offline, skipping"));
                return PackageOutcome::Skipped(PackageApplicability::NotOfflineCapable);
            }
            skipped => {
                println!("    {}", skipped.describe().dimmed());
                return PackageOutcome::Skipped(skipped);
            }
        }

        match self.dism.add_package(&self.mount_dir, package) {
            Ok(output) if parse::operation_succeeded(&output) => {
                Output::success(format!("Applied {title}"));
                PackageOutcome::Applied
            }
            Ok(output) => {
                let code = output.code.map_or_else(|| "none".to_string(), |c| format!("{c:#x}"));
                self.report_failure(title, &format!("exit code {code}"));
                PackageOutcome::Failed
            }
            Err(err) => {
                self.report_failure(title, &format!("{err:#}"));
                PackageOutcome::Failed
            }
        }
    }

    fn report_failure(&self, title: &str, detail: &str) {
        tracing::warn!(title, detail, "package failed");
        Output::warning(format!("Failed to apply {title} ({detail})"));
        Output::hint(format!("See {} for details", self.log_file.display()));
    }

    /// Apply every resolved package, recording outcomes in `report`.
    pub fn apply_all(&self, installables: &Installables, report: &mut ServicingReport) {
        let total = installables.len();
        for (index, (package, title)) in installables.iter().enumerate() {
            let file = package
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Output::step(format!(
                "{} {title} {}",
                format!("[{}/{total}]", index + 1).dimmed(),
                file.dimmed()
            ));
            let outcome = self.apply(package, title);
            tracing::debug!(package = %package.display(), outcome = outcome.describe(), "package processed");
            report.push(package, title, outcome);
        }
    }

    /// Unmount, committing or discarding every change made in this session.
    pub fn finish(self, mode: FinishMode) -> Result<()> {
        let verb = match mode {
            FinishMode::Commit => "Committing",
            FinishMode::Discard => "Discarding",
        };
        let spinner = Output::spinner(format!(
            "{verb} changes and unmounting {}...",
            self.mount_dir.display()
        ));
        let output = match self.dism.unmount(&self.mount_dir, mode) {
            Ok(output) => output,
            Err(err) => {
                spinner.finish_error("Unmount failed");
                return Err(err);
            }
        };

        if output.success || parse::operation_succeeded(&output) {
            spinner.finish_success(format!("Unmounted {}", self.mount_dir.display()));
            Ok(())
        } else {
            spinner.finish_error("Unmount failed");
            Err(PatchError::UnmountFailed {
                mount_dir: self.mount_dir,
                mode: mode.dism_switch(),
            }
            .into())
        }
    }
}
