//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::rc::Rc;

use crate::notify::{FailureNotification, NotificationError, Notifier};
use crate::transfer::{CommandError, CommandOutput, CommandRunner};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic transfer outcomes without spawning processes.
/// When the queue is empty the runner reports a spawn failure.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<CommandOutput>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns the last two arguments: rsync's source and destination.
    #[must_use]
    pub fn endpoints(&self) -> Option<(String, String)> {
        let mut tail = self.args.iter().rev();
        let destination = tail.next()?.to_string_lossy().into_owned();
        let source = tail.next()?.to_string_lossy().into_owned();
        Some((source, destination))
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status with the given stdout.
    pub fn push_success(&self, stdout: impl Into<String>) {
        self.push_output(Some(0), stdout, "");
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.push_output(Some(code), "", stderr);
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Notifier double that records every notification it is asked to send.
///
/// Set `fail` to make every delivery report a relay error after recording.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Rc<RefCell<Vec<FailureNotification>>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Creates a notifier whose deliveries succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier whose deliveries always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Rc::default(),
            fail: true,
        }
    }

    /// Returns a snapshot of the notifications seen so far.
    #[must_use]
    pub fn sent(&self) -> Vec<FailureNotification> {
        self.sent.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &FailureNotification) -> Result<(), NotificationError> {
        self.sent.borrow_mut().push(notification.clone());
        if self.fail {
            return Err(NotificationError::Delivery(String::from(
                "simulated relay refusal",
            )));
        }
        Ok(())
    }
}
