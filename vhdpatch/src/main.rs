use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use vhdpatch::command_runner::RealCommandRunner;
use vhdpatch::output::Output;
use vhdpatch::pipeline;
use vhdpatch::prompt::TerminalPrompt;
use vhdpatch::{Cli, RunConfig};

/// `RUST_LOG` wins; otherwise --debug / --verbose pick the level.
fn env_filter(cli: &Cli) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    let directive = if cli.debug {
        "vhdpatch=debug"
    } else if cli.verbose {
        "vhdpatch=info"
    } else {
        "vhdpatch=warn"
    };
    EnvFilter::new(directive)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&cli))
        .with_writer(std::io::stderr)
        .init();

    let config = RunConfig::from_cli(&cli);
    tracing::debug!(?config, "run configuration");

    match pipeline::run(&config, &RealCommandRunner, &TerminalPrompt) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            Output::error(format!("{err:#}"));
            Output::hint(format!("Log: {}", config.log_file.display()));
            ExitCode::FAILURE
        }
    }
}
