//! Core library for the `hostmirror` backup tool.
//!
//! A backup pass reads a mapping of remote hosts to remote directories,
//! mirrors each directory into `{backup_root}/{host}/...` with rsync over
//! SSH, appends a record of every job to `{log_dir}/{host}.log`, and mails
//! the operator when a job fails. Jobs run sequentially and independently.

pub mod diagnostics;
pub mod notify;
pub mod orchestrator;
pub mod plan;
pub mod run_log;
pub mod settings;
pub mod sources;
pub mod test_support;
pub mod transfer;

pub use notify::{FailureNotification, NotificationError, Notifier, SmtpNotifier};
pub use orchestrator::{BackupOrchestrator, JobFailure, RunError, RunSummary};
pub use plan::{BackupJob, PathPlanner, PlanError};
pub use run_log::{JobLog, RunLogError, RunLogger, RunRecord};
pub use settings::{BackupSettings, SettingsError};
pub use sources::{BackupConfig, ConfigError, HostSources};
pub use transfer::{
    CommandError, CommandOutput, CommandRunner, ProcessCommandRunner, TransferConfig,
    TransferResult, TransferRunner,
};
