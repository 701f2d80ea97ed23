//! Append-only per-host run logs.
//!
//! Every job opens its host's log file once, writes the start block, then the
//! outcome, and releases the handle. Records accumulate across runs; nothing
//! here truncates or rotates a log.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::{Dir, File, OpenOptions};
use cap_std::ambient_authority;
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::plan::BackupJob;
use crate::transfer::TransferResult;

/// Format of the run-start timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SEPARATOR: &str = "----------------------------------------";

/// Raised when a log record cannot be written.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to write run log {path}: {message}")]
pub struct RunLogError {
    /// Log file that could not be written.
    pub path: Utf8PathBuf,
    /// Operating system error string.
    pub message: String,
}

/// What a job log records about one transfer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunRecord {
    /// Run start time, shared by every job of the run.
    pub timestamp: String,
    /// Source host.
    pub host: String,
    /// Normalised remote directory.
    pub remote_dir: String,
    /// Local mirror directory.
    pub local_dir: Utf8PathBuf,
}

impl RunRecord {
    /// Captures the fields of `job` stamped with `run_started`.
    #[must_use]
    pub fn new(job: &BackupJob, run_started: &DateTime<Local>) -> Self {
        Self {
            timestamp: run_started.format(TIMESTAMP_FORMAT).to_string(),
            host: job.host.clone(),
            remote_dir: job.remote_dir.clone(),
            local_dir: job.local_dir.clone(),
        }
    }

    fn render_header(&self) -> String {
        format!(
            "\n{SEPARATOR}\n  Backup Run: {}\n{SEPARATOR}\n",
            self.timestamp
        )
    }

    /// Renders the separator block and the starting line.
    #[must_use]
    pub fn render_start(&self) -> String {
        format!(
            "{}Starting rsync: {}:{} -> {}\n",
            self.render_header(),
            self.host,
            self.remote_dir,
            self.local_dir
        )
    }

    /// Renders the separator block and a line noting the transfer was skipped.
    #[must_use]
    pub fn render_skipped(&self) -> String {
        format!(
            "{}Skipping rsync: {}:{} -> {} (mirror directory unavailable)\n",
            self.render_header(),
            self.host,
            self.remote_dir,
            self.local_dir
        )
    }

    /// Renders the failure message, also used as the notification body.
    #[must_use]
    pub fn render_failure(&self, stderr: &str) -> String {
        format!(
            "Rsync failed for {}:{} to {}\n{stderr}\n",
            self.host, self.remote_dir, self.local_dir
        )
    }

    /// Renders the outcome text for `result`.
    #[must_use]
    pub fn render_outcome(&self, result: &TransferResult) -> String {
        if result.success {
            result.output.clone()
        } else {
            self.render_failure(&result.output)
        }
    }
}

/// Opens the per-host log file named by each job.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunLogger;

impl RunLogger {
    /// Creates a logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Opens `job.log_file` for appending and writes the start block.
    ///
    /// The returned [`JobLog`] owns the file handle until
    /// [`JobLog::log_result`] consumes it or it is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RunLogError`] when the log directory or file cannot be
    /// opened, or the start block cannot be written.
    pub fn log_start(
        &self,
        job: &BackupJob,
        run_started: &DateTime<Local>,
    ) -> Result<JobLog, RunLogError> {
        let record = RunRecord::new(job, run_started);
        let start = record.render_start();
        JobLog::open(job, record, &start)
    }

    /// Opens `job.log_file` for a job whose mirror directory could not be
    /// prepared. The header is followed by a skip line instead of the
    /// starting line, since no transfer runs.
    ///
    /// # Errors
    ///
    /// See [`RunLogger::log_start`].
    pub fn log_skipped(
        &self,
        job: &BackupJob,
        run_started: &DateTime<Local>,
    ) -> Result<JobLog, RunLogError> {
        let record = RunRecord::new(job, run_started);
        let skipped = record.render_skipped();
        JobLog::open(job, record, &skipped)
    }
}

/// Open log handle for one job.
#[derive(Debug)]
pub struct JobLog {
    path: Utf8PathBuf,
    file: File,
    record: RunRecord,
}

impl JobLog {
    fn open(job: &BackupJob, record: RunRecord, first_block: &str) -> Result<Self, RunLogError> {
        let file = open_append(&job.log_file).map_err(|err| RunLogError {
            path: job.log_file.clone(),
            message: err.to_string(),
        })?;
        let mut log = Self {
            path: job.log_file.clone(),
            file,
            record,
        };
        log.append(first_block)?;
        Ok(log)
    }

    /// Returns the record this handle writes.
    #[must_use]
    pub const fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Appends the transfer outcome and releases the file handle.
    ///
    /// # Errors
    ///
    /// Returns [`RunLogError`] when the write or flush fails. The handle is
    /// released either way.
    pub fn log_result(mut self, result: &TransferResult) -> Result<(), RunLogError> {
        let outcome = self.record.render_outcome(result);
        self.append(&outcome)
    }

    fn append(&mut self, text: &str) -> Result<(), RunLogError> {
        self.file
            .write_all(text.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|err| RunLogError {
                path: self.path.clone(),
                message: err.to_string(),
            })
    }
}

fn open_append(path: &Utf8Path) -> io::Result<File> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "log path is missing a filename")
    })?;

    Dir::create_ambient_dir_all(parent, ambient_authority())?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    dir.open_with(file_name, &options)
}
