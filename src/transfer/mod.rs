//! Rsync mirroring of one remote directory over SSH.
//!
//! Each job becomes a single blocking `rsync -avz --delete` invocation that
//! mirrors the *contents* of `host:remote_dir/` into `local_dir/`. The
//! process is not given a deadline; a hung transfer blocks the run until it
//! exits.

use std::ffi::OsString;

use shell_escape::unix::escape;

use crate::plan::BackupJob;
use crate::settings::BackupSettings;

mod types;
mod util;

pub use types::{
    CommandError, CommandOutput, CommandRunner, ProcessCommandRunner, TransferResult,
};
pub use util::expand_tilde;

/// Tool paths and credentials used for every transfer in a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferConfig {
    /// Path to the `rsync` executable.
    pub rsync_bin: String,
    /// Path to the `ssh` executable used as the remote shell.
    pub ssh_bin: String,
    /// Private key handed to `ssh -i`.
    pub ssh_key_path: String,
}

impl From<&BackupSettings> for TransferConfig {
    fn from(settings: &BackupSettings) -> Self {
        Self {
            rsync_bin: settings.rsync_bin.clone(),
            ssh_bin: settings.ssh_bin.clone(),
            ssh_key_path: settings.ssh_key_path.clone(),
        }
    }
}

/// Runs rsync for backup jobs through a [`CommandRunner`].
#[derive(Clone, Debug)]
pub struct TransferRunner<R: CommandRunner> {
    config: TransferConfig,
    runner: R,
}

impl TransferRunner<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    #[must_use]
    pub const fn with_process_runner(config: TransferConfig) -> Self {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> TransferRunner<R> {
    /// Creates a transfer runner using the provided configuration and runner.
    #[must_use]
    pub const fn new(config: TransferConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Mirrors `job` and classifies the outcome.
    ///
    /// Never fails: a spawn error or a non-zero exit status is reported as an
    /// unsuccessful [`TransferResult`] so the caller can move on to the next
    /// job.
    pub fn run(&self, job: &BackupJob) -> TransferResult {
        let args = self.build_rsync_args(job);
        tracing::debug!(
            program = %self.config.rsync_bin,
            args = ?args,
            "invoking rsync"
        );

        match self.runner.run(&self.config.rsync_bin, &args) {
            Ok(output) => TransferResult::from_output(output),
            Err(err) => TransferResult::spawn_failure(&err),
        }
    }

    pub(crate) fn build_rsync_args(&self, job: &BackupJob) -> Vec<OsString> {
        vec![
            OsString::from("-e"),
            OsString::from(self.build_remote_shell()),
            OsString::from("-avz"),
            OsString::from("--delete"),
            OsString::from(format!("{}:{}/", job.host, job.remote_dir)),
            OsString::from(format!("{}/", job.local_dir)),
        ]
    }

    fn build_remote_shell(&self) -> String {
        let key = expand_tilde(&self.config.ssh_key_path);
        format!(
            "{} -i {}",
            self.config.ssh_bin,
            escape(key.as_str().into())
        )
    }
}
