//! Operator confirmation before packages are applied.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;

use crate::output::Output;

pub trait Confirm {
    /// Ask a yes/no question; anything but an explicit yes is `false`.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Interactive prompt on the controlling terminal.
///
/// A non-interactive stdin answers "no" without prompting.
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            Output::warning("Non-interactive mode detected; treating confirmation as declined.");
            return Ok(false);
        }

        cliclack::confirm(question)
            .initial_value(false)
            .interact()
            .context("Failed to read confirmation")
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::Cell;

    /// Fixed answer that counts how often it was asked.
    pub struct Answer {
        yes: bool,
        asked: Cell<usize>,
    }

    impl Answer {
        pub fn yes() -> Self {
            Self {
                yes: true,
                asked: Cell::new(0),
            }
        }

        pub fn no() -> Self {
            Self {
                yes: false,
                asked: Cell::new(0),
            }
        }

        pub fn asked(&self) -> usize {
            self.asked.get()
        }
    }

    impl Confirm for Answer {
        fn confirm(&self, _question: &str) -> Result<bool> {
            self.asked.set(self.asked.get() + 1);
            Ok(self.yes)
        }
    }
}
