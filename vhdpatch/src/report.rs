//! Summary of a servicing run.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::FinishMode;
use crate::dism::PackageApplicability;
use crate::output::Output;

/// What happened to one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageOutcome {
    Applied,
    Failed,
    Skipped(PackageApplicability),
}

impl PackageOutcome {
    pub fn describe(self) -> &'static str {
        match self {
            PackageOutcome::Applied => "applied",
            PackageOutcome::Failed => "failed",
            PackageOutcome::Skipped(why) => why.describe(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PackageResult {
    pub path: PathBuf,
    pub title: String,
    pub outcome: PackageOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServicingReport {
    pub started: DateTime<Local>,
    pub image: PathBuf,
    pub mount_dir: PathBuf,
    pub updates: usize,
    pub resolved: usize,
    /// `false` when the operator declined or the run was a dry run.
    pub applied_phase: bool,
    pub finish: Option<String>,
    pub packages: Vec<PackageResult>,
}

impl ServicingReport {
    pub fn new(image: &Path, mount_dir: &Path) -> Self {
        Self {
            started: Local::now(),
            image: image.to_path_buf(),
            mount_dir: mount_dir.to_path_buf(),
            updates: 0,
            resolved: 0,
            applied_phase: false,
            finish: None,
            packages: Vec::new(),
        }
    }

    pub fn push(&mut self, path: &Path, title: &str, outcome: PackageOutcome) {
        self.packages.push(PackageResult {
            path: path.to_path_buf(),
            title: title.to_string(),
            outcome,
        });
    }

    pub fn finished(&mut self, mode: FinishMode) {
        self.finish = Some(
            match mode {
                FinishMode::Commit => "commit",
                FinishMode::Discard => "discard",
            }
            .to_string(),
        );
    }

    pub fn count(&self, outcome: PackageOutcome) -> usize {
        self.packages.iter().filter(|p| p.outcome == outcome).count()
    }

    pub fn skipped(&self) -> usize {
        self.packages
            .iter()
            .filter(|p| matches!(p.outcome, PackageOutcome::Skipped(_)))
            .count()
    }

    pub fn print_summary(&self) {
        Output::header("Summary");
        Output::kv("Updates approved", self.updates.to_string());
        Output::kv("Packages resolved", self.resolved.to_string());
        Output::kv("Applied", self.count(PackageOutcome::Applied).to_string());
        Output::kv("Skipped", self.skipped().to_string());
        Output::kv("Failed", self.count(PackageOutcome::Failed).to_string());
        if let Some(finish) = &self.finish {
            Output::kv("Image changes", finish);
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))
    }
}
