//! `CommandRunner` double that serves `host:path` sources from local trees.
//!
//! Each host maps to a local directory standing in for its filesystem. Hosts
//! listed as unreachable fail with rsync's exit code 255 and an ssh-style
//! error, so failure handling can be exercised alongside real copies.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use hostmirror::{CommandError, CommandOutput, CommandRunner};

use super::rsync_simulator::simulate_rsync;

#[derive(Clone, Debug, Default)]
pub struct LocalCopyRunner {
    hosts: BTreeMap<String, Utf8PathBuf>,
    unreachable: BTreeSet<String>,
    sources: Rc<RefCell<Vec<String>>>,
}

impl LocalCopyRunner {
    pub fn with_host(mut self, host: &str, root: &Utf8Path) -> Self {
        self.hosts.insert(host.to_owned(), root.to_path_buf());
        self
    }

    pub fn with_unreachable_host(mut self, host: &str) -> Self {
        self.unreachable.insert(host.to_owned());
        self
    }

    /// Sources passed to rsync, in invocation order.
    pub fn sources(&self) -> Vec<String> {
        self.sources.borrow().clone()
    }

    fn spawn_error(message: &str) -> CommandError {
        CommandError {
            program: String::from("rsync"),
            message: message.to_owned(),
        }
    }

    fn endpoints(args: &[OsString]) -> Result<(String, String), CommandError> {
        let mut tail = args.iter().rev().map(|arg| arg.to_str());
        let destination = tail
            .next()
            .flatten()
            .ok_or_else(|| Self::spawn_error("missing destination argument"))?;
        let source = tail
            .next()
            .flatten()
            .ok_or_else(|| Self::spawn_error("missing source argument"))?;
        Ok((source.to_owned(), destination.to_owned()))
    }
}

impl CommandRunner for LocalCopyRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        if program != "rsync" {
            return Err(CommandError {
                program: program.to_owned(),
                message: String::from("local runner only simulates rsync"),
            });
        }

        let (source, destination) = Self::endpoints(args)?;
        self.sources.borrow_mut().push(source.clone());
        let (host, remote_path) = source
            .split_once(':')
            .ok_or_else(|| Self::spawn_error("source is not host:path"))?;

        if self.unreachable.contains(host) {
            return Ok(CommandOutput {
                code: Some(255),
                stdout: String::new(),
                stderr: format!("ssh: connect to host {host} port 22: Connection refused"),
            });
        }

        let root = self
            .hosts
            .get(host)
            .ok_or_else(|| Self::spawn_error("unknown host"))?;
        let remote_dir = root.join(remote_path.trim_start_matches('/'));
        if !remote_dir.is_dir() {
            return Ok(CommandOutput {
                code: Some(23),
                stdout: String::new(),
                stderr: format!("rsync: change_dir \"{remote_path}\" failed: No such file or directory (2)"),
            });
        }

        let copied = simulate_rsync(&remote_dir, Utf8Path::new(&destination))
            .map_err(|err| Self::spawn_error(&err.to_string()))?;
        Ok(CommandOutput {
            code: Some(0),
            stdout: format!("sent {copied} files\n"),
            stderr: String::new(),
        })
    }
}
