//! Abstraction over external command execution for testability.
//!
//! Every external tool vhdpatch drives (DISM for the image, PowerShell for the
//! WSUS administration API) goes through the [`CommandRunner`] trait, so the
//! whole servicing pipeline can be exercised in-process.
//!
//! # Production Usage
//!
//! [`RealCommandRunner`] delegates to [`std::process::Command`].
//!
//! # Testing Usage
//!
//! `testing::MockCommandRunner` records all calls and returns canned
//! responses keyed by an argument fragment.

use anyhow::Result;
use std::process::Command;

use crate::error::PatchError;

/// Captured result of one external command.
///
/// Output is decoded lossily; both DISM and PowerShell emit text that is only
/// ever inspected line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// A successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result with the given exit code and stdout.
    pub fn failed(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// True if some stdout line equals `marker` exactly.
    ///
    /// Only line terminators are stripped; trailing spaces are significant.
    pub fn has_line(&self, marker: &str) -> bool {
        self.stdout.lines().any(|line| line == marker)
    }

    /// Stdout followed by stderr, for the run log.
    pub fn transcript(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Trait for abstracting external command execution.
pub trait CommandRunner {
    /// Run a command to completion and capture its output.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`ToolOutput::success`] and the text. Only a failure to launch the
    /// program is returned as `Err`.
    fn run_output(&self, program: &str, args: &[String]) -> Result<ToolOutput>;
}

/// Production implementation that delegates to [`std::process::Command`].
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run_output(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
        tracing::debug!(program, ?args, "running external command");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| PatchError::Launch {
                program: program.to_string(),
                source,
            })?;
        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
#[allow(dead_code)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Recorded invocation.
    #[derive(Debug, Clone)]
    pub struct Call {
        pub program: String,
        pub args: Vec<String>,
    }

    impl Call {
        pub fn has_arg(&self, fragment: &str) -> bool {
            self.args.iter().any(|a| a.contains(fragment))
        }
    }

    /// Mock runner that records calls and answers from canned responses.
    ///
    /// A response is selected by the first registered fragment contained in
    /// any argument. Queued responses are consumed in order; the last one is
    /// repeated. Calls with no matching fragment get an empty success.
    #[derive(Default)]
    pub struct MockCommandRunner {
        responses: RefCell<Vec<(String, VecDeque<Result<ToolOutput, String>>)>>,
        calls: RefCell<Vec<Call>>,
    }

    impl MockCommandRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for invocations whose args contain `fragment`.
        pub fn respond(self, fragment: &str, output: ToolOutput) -> Self {
            self.push(fragment, Ok(output));
            self
        }

        /// Queue a launch failure for invocations whose args contain `fragment`.
        pub fn fail_launch(self, fragment: &str, message: &str) -> Self {
            self.push(fragment, Err(message.to_string()));
            self
        }

        fn push(&self, fragment: &str, response: Result<ToolOutput, String>) {
            let mut responses = self.responses.borrow_mut();
            match responses.iter_mut().find(|(f, _)| f == fragment) {
                Some((_, queue)) => queue.push_back(response),
                None => responses.push((fragment.to_string(), VecDeque::from([response]))),
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        /// Number of recorded calls with an argument containing `fragment`.
        pub fn count(&self, fragment: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.has_arg(fragment)).count()
        }
    }

    impl CommandRunner for MockCommandRunner {
        fn run_output(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
            self.calls.borrow_mut().push(Call {
                program: program.to_string(),
                args: args.to_vec(),
            });

            let mut responses = self.responses.borrow_mut();
            let queue = responses
                .iter_mut()
                .find(|(fragment, _)| args.iter().any(|a| a.contains(fragment.as_str())))
                .map(|(_, queue)| queue);

            let response = match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };

            match response {
                Some(Ok(output)) => Ok(output),
                Some(Err(message)) => anyhow::bail!("{message}"),
                None => Ok(ToolOutput::ok("")),
            }
        }
    }
}
