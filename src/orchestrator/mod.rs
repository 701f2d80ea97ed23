//! Drives one backup pass over every configured host directory.
//!
//! The pass loads the sources file once, expands it into jobs (host order,
//! then directory order), and for each job plans paths, logs the start,
//! runs the transfer, logs the outcome, and notifies on failure. A failing
//! job never stops the jobs after it.

use camino::Utf8Path;
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::notify::{FailureNotification, Notifier};
use crate::plan::{BackupJob, PathPlanner};
use crate::run_log::{JobLog, RunLogError, RunLogger, RunRecord};
use crate::sources::{self, BackupConfig, ConfigError};
use crate::transfer::{CommandRunner, TransferResult, TransferRunner};

/// Errors that end a run before any job starts.
#[derive(Debug, Error)]
pub enum RunError {
    /// Raised when the sources file cannot be loaded.
    #[error("backup sources unavailable: {0}")]
    Config(#[from] ConfigError),
}

/// A job that did not complete successfully.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JobFailure {
    /// Host of the failed job.
    pub host: String,
    /// Remote directory of the failed job.
    pub remote_dir: String,
    /// Captured diagnostic text.
    pub message: String,
}

/// Aggregate outcome of a run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// Number of jobs whose transfer succeeded.
    pub succeeded: usize,
    /// Jobs that failed, in processing order.
    pub failed: Vec<JobFailure>,
}

impl RunSummary {
    /// Number of jobs attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// Returns `true` when no job failed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Executes backup passes with the provided collaborators.
#[derive(Debug)]
pub struct BackupOrchestrator<R: CommandRunner, N: Notifier> {
    planner: PathPlanner,
    transfer: TransferRunner<R>,
    logger: RunLogger,
    notifier: N,
}

impl<R, N> BackupOrchestrator<R, N>
where
    R: CommandRunner,
    N: Notifier,
{
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(
        planner: PathPlanner,
        transfer: TransferRunner<R>,
        logger: RunLogger,
        notifier: N,
    ) -> Self {
        Self {
            planner,
            transfer,
            logger,
            notifier,
        }
    }

    /// Loads the mapping at `sources_path` and runs every job.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Config`] when the sources file is missing,
    /// malformed, or lacks the `backup_source` mapping. No job runs in that
    /// case.
    pub fn execute(&self, sources_path: &Utf8Path) -> Result<RunSummary, RunError> {
        let config = sources::load(sources_path).inspect_err(|err| {
            tracing::error!(path = %sources_path, error = %err, "cannot load backup sources");
        })?;
        Ok(self.run(&config))
    }

    /// Runs every job in `config` and returns the aggregate outcome.
    pub fn run(&self, config: &BackupConfig) -> RunSummary {
        let run_started = Local::now();
        tracing::info!(
            hosts = config.hosts().len(),
            jobs = config.job_count(),
            "backup run started"
        );

        let mut summary = RunSummary::default();
        for (host, remote_dir) in config.pairs() {
            match self.run_job(host, remote_dir, &run_started) {
                Ok(()) => summary.succeeded += 1,
                Err(failure) => summary.failed.push(failure),
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "backup run finished"
        );
        summary
    }

    fn run_job(
        &self,
        host: &str,
        remote_dir: &str,
        run_started: &DateTime<Local>,
    ) -> Result<(), JobFailure> {
        let (job, log, result) = match self.planner.plan(host, remote_dir) {
            Ok(job) => {
                let log = Self::open_log(self.logger.log_start(&job, run_started));
                tracing::info!(
                    source = %job.source_label(),
                    local_dir = %job.local_dir,
                    "starting rsync"
                );
                let result = self.transfer.run(&job);
                (job, log, result)
            }
            Err(err) => {
                let job = self.planner.job_for(host, remote_dir);
                let log = Self::open_log(self.logger.log_skipped(&job, run_started));
                (job, log, TransferResult::failure(err.to_string(), None))
            }
        };

        let record = log.as_ref().map_or_else(
            || RunRecord::new(&job, run_started),
            |open| open.record().clone(),
        );
        if let Some(open) = log
            && let Err(err) = open.log_result(&result)
        {
            tracing::warn!(error = %err, "failed to record transfer outcome");
        }

        if result.success {
            tracing::info!(source = %job.source_label(), "rsync completed");
            return Ok(());
        }

        tracing::warn!(
            source = %job.source_label(),
            status = %result.status_text(),
            "rsync failed"
        );
        let message = record.render_failure(&result.output);
        self.send_alert(&job, &message);
        Err(JobFailure {
            host: job.host,
            remote_dir: job.remote_dir,
            message,
        })
    }

    fn open_log(opened: Result<JobLog, RunLogError>) -> Option<JobLog> {
        opened
            .inspect_err(|err| tracing::warn!(error = %err, "run log unavailable"))
            .ok()
    }

    fn send_alert(&self, job: &BackupJob, message: &str) {
        let notification = FailureNotification::for_job(job, message);
        if let Err(err) = self.notifier.notify(&notification) {
            tracing::warn!(source = %job.source_label(), error = %err, "failed to send email");
        }
    }
}
