//! Plain-text run log.
//!
//! The log is truncated when a run starts and receives a timestamped header
//! plus the raw output of every external command. It is the place operators
//! are pointed at when a package fails to apply.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::command_runner::{CommandRunner, ToolOutput};
use crate::error::PatchError;

pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Create or truncate the log at `path`.
    pub fn create(path: &Path) -> Result<Self, PatchError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| PatchError::Log {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line prefixed with the local time.
    pub fn note(&self, message: impl AsRef<str>) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        self.write(&format!("[{stamp}] {}\n", message.as_ref()));
    }

    /// Append the command line and full output of an external tool call.
    pub fn record(&self, program: &str, args: &[String], output: &ToolOutput) {
        self.note(format!("{program} {}", args.join(" ")));
        let code = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        self.write(&format!("{}\n[exit code {code}]\n", output.transcript()));
    }

    // Log writes never abort servicing; the image must still be finalized.
    fn write(&self, text: &str) {
        if let Err(err) = (&self.file).write_all(text.as_bytes()) {
            tracing::warn!(path = %self.path.display(), %err, "failed to write run log");
        }
    }
}

/// Runner decorator that records every external call in the run log.
pub struct LoggedRunner<'a> {
    inner: &'a dyn CommandRunner,
    log: &'a RunLog,
}

impl<'a> LoggedRunner<'a> {
    pub fn new(inner: &'a dyn CommandRunner, log: &'a RunLog) -> Self {
        Self { inner, log }
    }
}

impl CommandRunner for LoggedRunner<'_> {
    fn run_output(&self, program: &str, args: &[String]) -> anyhow::Result<ToolOutput> {
        match self.inner.run_output(program, args) {
            Ok(output) => {
                self.log.record(program, args, &output);
                Ok(output)
            }
            Err(err) => {
                self.log.note(format!("{program} {}: {err:#}", args.join(" ")));
                Err(err)
            }
        }
    }
}
