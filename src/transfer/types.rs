//! Command runner abstraction and transfer outcome types.

use std::ffi::OsString;
use std::process::Command;

use thiserror::Error;

/// Raised when an external command cannot be started.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to spawn {program}: {message}")]
pub struct CommandError {
    /// Command that failed to start.
    pub program: String,
    /// Operating system error string.
    pub message: String,
}

/// Result of running an external command to completion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, blocking until it exits and
    /// capturing stdout and stderr separately.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| CommandError {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Classified outcome of one transfer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferResult {
    /// Whether rsync exited with status zero.
    pub success: bool,
    /// Captured stdout on success, captured stderr (or the spawn error) on
    /// failure.
    pub output: String,
    /// Exit code, absent when the process was killed or never started.
    pub exit_code: Option<i32>,
}

impl TransferResult {
    /// Classifies a finished command.
    #[must_use]
    pub fn from_output(output: CommandOutput) -> Self {
        if output.is_success() {
            Self {
                success: true,
                output: output.stdout,
                exit_code: output.code,
            }
        } else {
            Self::failure(output.stderr, output.code)
        }
    }

    /// Builds a failed result carrying `output` as its diagnostic text.
    #[must_use]
    pub const fn failure(output: String, exit_code: Option<i32>) -> Self {
        Self {
            success: false,
            output,
            exit_code,
        }
    }

    /// Builds a failed result for a command that never started.
    #[must_use]
    pub fn spawn_failure(err: &CommandError) -> Self {
        Self::failure(err.to_string(), None)
    }

    /// Human readable exit status for diagnostics.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.exit_code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}
