//! vhdpatch: apply approved WSUS updates to an offline virtual disk image.
//!
//! A run is a straight line: check preconditions, ask the WSUS server for
//! approved updates, map their `.cab` packages onto the local content store,
//! then mount the image with DISM, add every pending package, and commit or
//! discard.
//!
//! Both external systems sit behind traits ([`command_runner::CommandRunner`]
//! and [`wsus::UpdateServer`]) so the pipeline is tested without Windows.

#![deny(rustdoc::broken_intra_doc_links)]

pub mod cli;
pub mod command_runner;
pub mod config;
pub mod content;
pub mod dism;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod preflight;
pub mod prompt;
pub mod report;
pub mod run_log;
pub mod servicer;
pub mod wsus;

pub use cli::Cli;
pub use config::RunConfig;
