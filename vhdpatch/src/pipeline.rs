//! The servicing run, top to bottom.
//!
//! 1. Create the run log and check preconditions
//! 2. Query the update server for approved updates
//! 3. Resolve their packages in the content store
//! 4. Mount, apply, and commit or discard
//!
//! [`run`] wires the production backends. [`service`] takes every external
//! collaborator as a trait object so the whole flow runs against mocks.

use anyhow::Result;

use crate::command_runner::CommandRunner;
use crate::config::RunConfig;
use crate::content;
use crate::dism::Dism;
use crate::output::Output;
use crate::preflight;
use crate::prompt::Confirm;
use crate::report::ServicingReport;
use crate::run_log::{LoggedRunner, RunLog};
use crate::servicer::ImageSession;
use crate::wsus::{self, PowerShellUpdateServer, UpdateRecord, UpdateServer};

/// Run a full servicing pass with the PowerShell WSUS backend.
pub fn run(
    config: &RunConfig,
    runner: &dyn CommandRunner,
    prompt: &dyn Confirm,
) -> Result<ServicingReport> {
    let log = RunLog::create(&config.log_file)?;
    log.note(format!(
        "vhdpatch {} servicing {}",
        env!("CARGO_PKG_VERSION"),
        config.image.display()
    ));
    preflight::run(config, &log)?;

    let runner = LoggedRunner::new(runner, &log);
    let server = PowerShellUpdateServer::connect(
        &runner,
        &config.admin_library,
        &config.server,
        config.port,
        config.use_ssl,
    );
    service(config, &log, &runner, &server, prompt)
}

/// Everything after preconditions: query, resolve, mount, apply, finish.
pub fn service(
    config: &RunConfig,
    log: &RunLog,
    runner: &dyn CommandRunner,
    server: &dyn UpdateServer,
    prompt: &dyn Confirm,
) -> Result<ServicingReport> {
    let mut report = ServicingReport::new(&config.image, &config.mount_dir);

    let updates = query_updates(config, server)?;
    report.updates = updates.len();

    let installables = content::resolve(&updates, &config.content_root);
    report.resolved = installables.len();
    log.note(format!(
        "{} approved updates, {} packages resolved under {}",
        updates.len(),
        installables.len(),
        config.content_root.display()
    ));
    Output::info(format!(
        "{} approved updates, {} packages found in the content store",
        updates.len(),
        installables.len()
    ));

    if config.dry_run {
        for (package, title) in installables.iter() {
            Output::dry_run(format!("Would apply {title} ({})", package.display()));
        }
        return finish_report(config, report);
    }

    let dism = Dism::new(runner, &config.dism);

    if installables.is_empty() {
        // A mount left by an earlier run is still finalized.
        match ImageSession::existing(&dism, config)? {
            Some(session) => {
                log.note("nothing to apply; finalizing existing mount");
                session.finish(config.finish)?;
                report.finished(config.finish);
            }
            None => Output::success("Nothing to apply; the image was not mounted."),
        }
        return finish_report(config, report);
    }

    let session = ImageSession::mount(&dism, config)?;

    if confirmed(config, prompt, installables.len()) {
        report.applied_phase = true;
        Output::header(format!("Servicing {}", session.mount_dir().display()));
        session.apply_all(&installables, &mut report);
    } else {
        Output::info("Skipping package installation.");
        log.note("operator declined; no packages applied");
    }

    session.finish(config.finish)?;
    report.finished(config.finish);
    finish_report(config, report)
}

fn query_updates(config: &RunConfig, server: &dyn UpdateServer) -> Result<Vec<UpdateRecord>> {
    let spinner = Output::spinner(format!(
        "Querying {}:{} for approved updates...",
        config.server, config.port
    ));
    let result = wsus::build_scope(server, config.target_group.as_deref())
        .and_then(|scope| server.updates(&scope));
    match result {
        Ok(updates) => {
            spinner.finish_success(format!("{} approved updates", updates.len()));
            Ok(updates)
        }
        Err(err) => {
            spinner.finish_error("Update query failed");
            Err(err)
        }
    }
}

/// Confirmation gate; prompt errors count as a decline so the image is
/// still finalized.
fn confirmed(config: &RunConfig, prompt: &dyn Confirm, count: usize) -> bool {
    if !config.require_confirmation {
        return true;
    }
    let question = format!(
        "Apply {count} packages to {}?",
        config.mount_dir.display()
    );
    match prompt.confirm(&question) {
        Ok(answer) => answer,
        Err(err) => {
            Output::warning(format!("{err:#}"));
            false
        }
    }
}

fn finish_report(config: &RunConfig, report: ServicingReport) -> Result<ServicingReport> {
    report.print_summary();
    if let Some(path) = &config.report {
        match report.write_json(path) {
            Ok(()) => Output::info(format!("Report written to {}", path.display())),
            Err(err) => {
                tracing::warn!(path = %path.display(), "report not written: {err:#}");
                Output::warning(format!("Could not write report to {}: {err:#}", path.display()));
            }
        }
    }
    Ok(report)
}
