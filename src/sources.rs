//! Loading of the host-to-directory backup mapping.
//!
//! The sources file is a JSON document whose `backup_source` key maps each
//! host to the ordered list of remote directories to mirror. Host order and
//! directory order are preserved so jobs run in the order the operator wrote
//! them.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde_json::Value;
use thiserror::Error;

/// Top-level key holding the host mapping.
pub const BACKUP_SOURCE_KEY: &str = "backup_source";

/// Errors that abort a run before any job is attempted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Raised when the sources file does not exist.
    #[error("sources file not found: {path}")]
    Missing {
        /// Path that was expected to hold the mapping.
        path: String,
    },
    /// Raised when the sources file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the file is not valid JSON.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when the `backup_source` mapping is absent.
    #[error("no [{key}] section found in config")]
    MissingKey {
        /// Key that was expected at the top level.
        key: String,
    },
    /// Raised when a host entry violates the mapping invariants.
    #[error("invalid entry for host '{host}': {message}")]
    InvalidEntry {
        /// Host whose entry is invalid.
        host: String,
        /// Human-readable description of the problem.
        message: String,
    },
}

/// Remote directories configured for one host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostSources {
    /// Host identifier passed to rsync (for example `user@host` or an SSH alias).
    pub host: String,
    /// Remote directories in configured order.
    pub remote_dirs: Vec<String>,
}

/// Immutable host mapping for one run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BackupConfig {
    hosts: Vec<HostSources>,
}

impl BackupConfig {
    /// Builds a config from `(host, dirs)` pairs, validating each entry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEntry`] when a host or directory is
    /// blank, when a host contains a path separator, or when a directory
    /// would escape the backup root.
    pub fn from_entries<I, H, D>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (H, Vec<D>)>,
        H: Into<String>,
        D: Into<String>,
    {
        let mut hosts = Vec::new();
        for (host, dirs) in entries {
            let host_name = host.into();
            validate_host(&host_name)?;
            let remote_dirs = dirs.into_iter().map(Into::into).collect::<Vec<String>>();
            for dir in &remote_dirs {
                validate_remote_dir(&host_name, dir)?;
            }
            hosts.push(HostSources {
                host: host_name,
                remote_dirs,
            });
        }
        Ok(Self { hosts })
    }

    /// Returns the hosts in configured order.
    #[must_use]
    pub fn hosts(&self) -> &[HostSources] {
        &self.hosts
    }

    /// Iterates every `(host, remote_dir)` pair, host order first.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hosts.iter().flat_map(|entry| {
            entry
                .remote_dirs
                .iter()
                .map(move |dir| (entry.host.as_str(), dir.as_str()))
        })
    }

    /// Total number of jobs described by the mapping.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.hosts.iter().map(|entry| entry.remote_dirs.len()).sum()
    }
}

/// Reads and validates the sources file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is missing or unreadable, is not
/// valid JSON, lacks the `backup_source` key, or holds invalid entries.
pub fn load(path: &Utf8Path) -> Result<BackupConfig, ConfigError> {
    let contents = read_sources(path)?;
    parse(path, &contents)
}

/// Parses sources file contents. `path` is used for error messages only.
///
/// # Errors
///
/// See [`load`].
pub fn parse(path: &Utf8Path, contents: &str) -> Result<BackupConfig, ConfigError> {
    let document: Value = serde_json::from_str(contents).map_err(|err| ConfigError::Parse {
        path: path.to_string(),
        message: err.to_string(),
    })?;

    let mapping = document
        .get(BACKUP_SOURCE_KEY)
        .ok_or_else(|| ConfigError::MissingKey {
            key: BACKUP_SOURCE_KEY.to_owned(),
        })?
        .as_object()
        .ok_or_else(|| ConfigError::Parse {
            path: path.to_string(),
            message: format!("'{BACKUP_SOURCE_KEY}' must be an object of host to directory lists"),
        })?;

    let mut entries = Vec::with_capacity(mapping.len());
    for (host, value) in mapping {
        let dirs = value.as_array().ok_or_else(|| ConfigError::InvalidEntry {
            host: host.clone(),
            message: String::from("expected a list of remote directories"),
        })?;
        let remote_dirs = dirs
            .iter()
            .map(|dir| {
                dir.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| ConfigError::InvalidEntry {
                        host: host.clone(),
                        message: format!("remote directory {dir} is not a string"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        entries.push((host.clone(), remote_dirs));
    }

    BackupConfig::from_entries(entries)
}

fn read_sources(path: &Utf8Path) -> Result<String, ConfigError> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| ConfigError::Io {
        path: path.to_string(),
        message: String::from("sources path is missing a filename"),
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|err| map_read_error(path, &err))?;
    dir.read_to_string(file_name)
        .map_err(|err| map_read_error(path, &err))
}

fn map_read_error(path: &Utf8Path, err: &io::Error) -> ConfigError {
    if err.kind() == io::ErrorKind::NotFound {
        ConfigError::Missing {
            path: path.to_string(),
        }
    } else {
        ConfigError::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

fn validate_host(host: &str) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidEntry {
        host: host.to_owned(),
        message: message.to_owned(),
    };

    if host.trim().is_empty() {
        return Err(invalid("host identifier must not be empty"));
    }
    if host.contains('/') || host == "." || host == ".." {
        return Err(invalid("host identifier must not be a path"));
    }
    Ok(())
}

fn validate_remote_dir(host: &str, dir: &str) -> Result<(), ConfigError> {
    if dir.trim().is_empty() {
        return Err(ConfigError::InvalidEntry {
            host: host.to_owned(),
            message: String::from("remote directory must not be empty"),
        });
    }
    if dir.split('/').any(|component| component == "..") {
        return Err(ConfigError::InvalidEntry {
            host: host.to_owned(),
            message: format!("remote directory {dir} must not contain '..'"),
        });
    }
    Ok(())
}
