//! Derivation of per-job local paths.

use camino::Utf8PathBuf;
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

/// Extension appended to the host name to form its log file.
const LOG_EXTENSION: &str = "log";

/// One `(host, remote_dir)` backup unit with its derived local paths.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackupJob {
    /// Host passed to rsync as the source side.
    pub host: String,
    /// Remote directory with trailing separators removed.
    pub remote_dir: String,
    /// Local mirror directory under the backup root.
    pub local_dir: Utf8PathBuf,
    /// Append-only log file shared by every job of this host.
    pub log_file: Utf8PathBuf,
}

impl BackupJob {
    /// Returns `host:remote_dir` as used in subjects and log lines.
    #[must_use]
    pub fn source_label(&self) -> String {
        format!("{}:{}", self.host, self.remote_dir)
    }
}

/// Raised when the local mirror directory cannot be prepared.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to create {path}: {message}")]
pub struct PlanError {
    /// Directory that could not be created.
    pub path: Utf8PathBuf,
    /// Operating system error string.
    pub message: String,
}

/// Maps configured pairs onto the local backup tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathPlanner {
    backup_root: Utf8PathBuf,
    log_dir: Utf8PathBuf,
}

impl PathPlanner {
    /// Creates a planner rooted at `backup_root` writing logs to `log_dir`.
    #[must_use]
    pub fn new(backup_root: impl Into<Utf8PathBuf>, log_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Derives the job for `host` and `remote_dir` without touching the disk.
    ///
    /// Trailing separators are stripped from `remote_dir`; the local mirror is
    /// `{backup_root}/{host}/{remote_dir without leading separators}`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use hostmirror::PathPlanner;
    /// let planner = PathPlanner::new("/backup", "/var/log/backup-data");
    /// let job = planner.job_for("webhost", "/var/www/");
    /// assert_eq!(job.remote_dir, "/var/www");
    /// assert_eq!(job.local_dir.as_str(), "/backup/webhost/var/www");
    /// assert_eq!(job.log_file.as_str(), "/var/log/backup-data/webhost.log");
    /// ```
    #[must_use]
    pub fn job_for(&self, host: &str, remote_dir: &str) -> BackupJob {
        let normalised = remote_dir.trim_end_matches('/');
        let relative = normalised.trim_start_matches('/');

        let host_root = self.backup_root.join(host);
        let local_dir = if relative.is_empty() {
            host_root
        } else {
            host_root.join(relative)
        };

        BackupJob {
            host: host.to_owned(),
            remote_dir: normalised.to_owned(),
            local_dir,
            log_file: self.log_dir.join(format!("{host}.{LOG_EXTENSION}")),
        }
    }

    /// Derives the job and creates its local mirror directory.
    ///
    /// Creation is idempotent: an existing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the directory cannot be created.
    pub fn plan(&self, host: &str, remote_dir: &str) -> Result<BackupJob, PlanError> {
        let job = self.job_for(host, remote_dir);
        Dir::create_ambient_dir_all(&job.local_dir, ambient_authority()).map_err(|err| {
            PlanError {
                path: job.local_dir.clone(),
                message: err.to_string(),
            }
        })?;
        Ok(job)
    }
}
