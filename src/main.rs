//! Binary entry point for `hostmirror`.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use hostmirror::{
    BackupOrchestrator, BackupSettings, PathPlanner, RunLogger, RunSummary, SmtpNotifier,
    TransferConfig, TransferRunner, diagnostics,
};

mod cli;

use cli::Cli;

/// Exit status when at least one job failed.
const EXIT_JOBS_FAILED: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("backup run aborted: {0}")]
    Run(#[from] hostmirror::RunError),
}

fn main() {
    let Cli {} = Cli::parse();
    let exit_code = match run() {
        Ok(summary) => exit_code_for(&summary),
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn run() -> Result<RunSummary, CliError> {
    let settings =
        BackupSettings::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    settings
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;

    if let Err(err) = diagnostics::init(&settings.log_level) {
        writeln!(io::stderr(), "{err}").ok();
    }

    let notifier = SmtpNotifier::from_settings(&settings);
    if let Some(err) = notifier.address_error() {
        tracing::error!(error = %err, "failure mail disabled for this run");
    }
    let orchestrator = BackupOrchestrator::new(
        PathPlanner::new(settings.backup_root_path(), settings.log_dir_path()),
        TransferRunner::with_process_runner(TransferConfig::from(&settings)),
        RunLogger::new(),
        notifier,
    );

    Ok(orchestrator.execute(settings.sources_path())?)
}

fn exit_code_for(summary: &RunSummary) -> i32 {
    if summary.all_succeeded() {
        0
    } else {
        EXIT_JOBS_FAILED
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
