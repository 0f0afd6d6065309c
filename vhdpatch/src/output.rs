//! Operator-facing output.
//!
//! Status lines with colored prefixes, plus a spinner for the calls that can
//! take minutes (the WSUS query and mounting a large image). Diagnostics go
//! through `tracing`; this module is only for what the operator reads.
//!
//! # Example
//!
//! ```rust,ignore
//! use vhdpatch::output::Output;
//!
//! Output::header("Servicing C:\\mount");
//! Output::step("[1/3] 2024-01 Cumulative Update");
//! Output::warning("Package is not offline capable, skipping");
//!
//! let spinner = Output::spinner("Mounting image...");
//! // ... dism /Mount-Image ...
//! spinner.finish_success("Mounted");
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::borrow::Cow;
use std::time::Duration;

pub struct Output;

impl Output {
    /// `✓ Applied 3 packages`
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// `✗ Image file not found: ...` (stderr)
    pub fn error(msg: impl AsRef<str>) {
        eprintln!("{} {}", "✗".red().bold(), msg.as_ref().red());
    }

    /// `⚠ C:\mount is already mounted`
    pub fn warning(msg: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow(), msg.as_ref());
    }

    /// `→ Querying update server...`
    pub fn info(msg: impl AsRef<str>) {
        println!("{} {}", "→".cyan(), msg.as_ref().dimmed());
    }

    /// One package in the servicing loop.
    pub fn step(msg: impl AsRef<str>) {
        println!("  {} {}", "•".cyan(), msg.as_ref());
    }

    pub fn header(msg: impl AsRef<str>) {
        println!("\n{}\n", msg.as_ref().bold().cyan());
    }

    /// Aligned key/value line used by the final summary.
    pub fn kv(key: impl AsRef<str>, value: impl AsRef<str>) {
        println!("  {:<20} {}", format!("{}:", key.as_ref()).cyan(), value.as_ref());
    }

    /// `  → See /tmp/vhdpatch.log`
    pub fn hint(msg: impl AsRef<str>) {
        println!("    {} {}", "→".cyan(), msg.as_ref());
    }

    pub fn dry_run(msg: impl AsRef<str>) {
        println!("{} {}", "[dry-run]".dimmed(), msg.as_ref().dimmed());
    }

    /// Spinner for long-running blocking calls; finish it with `finish_*`.
    pub fn spinner(msg: impl Into<Cow<'static, str>>) -> Spinner {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(80));
        Spinner(pb)
    }
}

pub struct Spinner(ProgressBar);

impl Spinner {
    pub fn finish_success(self, msg: impl AsRef<str>) {
        self.0
            .finish_with_message(format!("{} {}", "✓".green().bold(), msg.as_ref()));
    }

    pub fn finish_error(self, msg: impl AsRef<str>) {
        self.0
            .finish_with_message(format!("{} {}", "✗".red().bold(), msg.as_ref()));
    }

    pub fn finish_clear(self) {
        self.0.finish_and_clear();
    }
}
