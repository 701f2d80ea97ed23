//! Command-line interface definitions for the `hostmirror` binary.
//!
//! The binary takes no arguments: every parameter comes from settings. The
//! parser exists so `--help` and `--version` behave as expected and so the
//! build script can render a man page.

use clap::Parser;

/// Top-level CLI for the `hostmirror` binary.
#[derive(Debug, Parser)]
#[command(
    name = "hostmirror",
    version,
    about = "Mirror configured remote host directories into the local backup tree",
    long_about = concat!(
        "Runs one backup pass: every directory listed under backup_source in ",
        "the sources file is mirrored with rsync over ssh, each job is appended ",
        "to {log_dir}/{host}.log, and failures are mailed to the operator.\n\n",
        "Settings are read from hostmirror.toml and HOSTMIRROR_* environment ",
        "variables. Exit status is 0 when every job succeeded, 2 when at least ",
        "one job failed, and 1 when settings or sources could not be loaded."
    )
)]
pub(crate) struct Cli {}
