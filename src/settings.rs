//! Operator settings loaded via `ortho-config`.
//!
//! [`BackupSettings`] carries every value that stays fixed for a run: where
//! the sources file lives, where mirrors and logs are written, which SSH key
//! authenticates the transfer, and how failure mail is addressed. Values merge
//! defaults, configuration files, and environment variables.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default location of the host-to-directory mapping.
pub const DEFAULT_SOURCES_FILE: &str = "/work/host-directory.json";

/// Default root of the local backup tree.
pub const DEFAULT_BACKUP_ROOT: &str = "/backup-folder";

/// Default directory holding per-host run logs.
pub const DEFAULT_LOG_DIR: &str = "/var/log/backup-data";

/// Default SMTP port of the local mail relay.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Settings for a backup pass, loaded once at startup.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "HOSTMIRROR",
    discovery(
        app_name = "hostmirror",
        env_var = "HOSTMIRROR_CONFIG_PATH",
        config_file_name = "hostmirror.toml",
        dotfile_name = ".hostmirror.toml",
        project_file_name = "hostmirror.toml"
    )
)]
pub struct BackupSettings {
    /// JSON file mapping hosts to the remote directories to mirror.
    #[ortho_config(default = DEFAULT_SOURCES_FILE.to_owned())]
    pub sources_file: String,
    /// Root of the local backup tree; mirrors land in `{backup_root}/{host}/...`.
    #[ortho_config(default = DEFAULT_BACKUP_ROOT.to_owned())]
    pub backup_root: String,
    /// Directory receiving `{host}.log` run logs.
    #[ortho_config(default = DEFAULT_LOG_DIR.to_owned())]
    pub log_dir: String,
    /// Private key passed to `ssh -i`. Supports tilde expansion.
    #[ortho_config(default = "~/.ssh/id_rsa".to_owned())]
    pub ssh_key_path: String,
    /// Path to the `rsync` executable.
    #[ortho_config(default = "rsync".to_owned())]
    pub rsync_bin: String,
    /// Path to the `ssh` executable used as rsync's remote shell.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Sender address for failure notifications.
    #[ortho_config(default = "hostmirror@localhost".to_owned())]
    pub mail_from: String,
    /// Operator address receiving failure notifications.
    #[ortho_config(default = "root@localhost".to_owned())]
    pub mail_to: String,
    /// Host name of the local mail relay.
    #[ortho_config(default = "localhost".to_owned())]
    pub smtp_host: String,
    /// Port of the local mail relay.
    #[ortho_config(default = DEFAULT_SMTP_PORT)]
    pub smtp_port: u16,
    /// Default diagnostic filter when `RUST_LOG` is unset.
    #[ortho_config(default = "info".to_owned())]
    pub log_level: String,
}

/// Errors raised when loading or validating [`BackupSettings`].
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SettingsError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("settings parsing failed: {0}")]
    Parse(String),
    /// Raised when a text setting arrives as a boolean or number, which
    /// happens for environment values such as `true` or `25`.
    #[error(
        "settings parsing failed: {message}; text settings cannot read as a boolean or number, \
         so give a full path (for example /bin/true) or quote the value in hostmirror.toml"
    )]
    NonTextValue {
        /// Underlying parser message naming the offending key.
        message: String,
    },
    /// Raised when a required value is blank. The message explains how to
    /// provide it.
    #[error(
        "missing {field}: set HOSTMIRROR_{env_suffix} or add {field} to hostmirror.toml",
        env_suffix = field.to_uppercase()
    )]
    MissingField {
        /// Setting that failed validation.
        field: String,
    },
    /// Raised when the relay port is zero.
    #[error("smtp_port must be non-zero")]
    InvalidPort,
}

impl BackupSettings {
    /// Loads settings from defaults, configuration files, and environment
    /// variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NonTextValue`] when a text setting was given
    /// a boolean or numeric value, and [`SettingsError::Parse`] for any other
    /// merge failure.
    pub fn load_without_cli_args() -> Result<Self, SettingsError> {
        Self::load_from_iter([std::ffi::OsString::from("hostmirror")])
            .map_err(|err| classify_load_error(err.to_string()))
    }

    /// Ensures required values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingField`] for the first blank field, or
    /// [`SettingsError::InvalidPort`] when `smtp_port` is zero.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let required = [
            (&self.sources_file, "sources_file"),
            (&self.backup_root, "backup_root"),
            (&self.log_dir, "log_dir"),
            (&self.ssh_key_path, "ssh_key_path"),
            (&self.rsync_bin, "rsync_bin"),
            (&self.ssh_bin, "ssh_bin"),
            (&self.mail_from, "mail_from"),
            (&self.mail_to, "mail_to"),
            (&self.smtp_host, "smtp_host"),
        ];
        for (value, field) in required {
            if value.trim().is_empty() {
                return Err(SettingsError::MissingField {
                    field: field.to_owned(),
                });
            }
        }

        if self.smtp_port == 0 {
            return Err(SettingsError::InvalidPort);
        }
        Ok(())
    }

    /// Returns the sources file as a UTF-8 path.
    #[must_use]
    pub fn sources_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.sources_file)
    }

    /// Returns the backup root as an owned UTF-8 path.
    #[must_use]
    pub fn backup_root_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.backup_root)
    }

    /// Returns the log directory as an owned UTF-8 path.
    #[must_use]
    pub fn log_dir_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.log_dir)
    }
}

fn classify_load_error(message: String) -> SettingsError {
    if message.contains("expected a string") {
        SettingsError::NonTextValue { message }
    } else {
        SettingsError::Parse(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn settings() -> BackupSettings {
        BackupSettings {
            sources_file: String::from("/etc/hostmirror/sources.json"),
            backup_root: String::from("/srv/backup"),
            log_dir: String::from("/var/log/hostmirror"),
            ssh_key_path: String::from("~/.ssh/id_ed25519"),
            rsync_bin: String::from("rsync"),
            ssh_bin: String::from("ssh"),
            mail_from: String::from("backup@example.org"),
            mail_to: String::from("ops@example.org"),
            smtp_host: String::from("localhost"),
            smtp_port: DEFAULT_SMTP_PORT,
            log_level: String::from("info"),
        }
    }

    #[rstest]
    fn validate_accepts_complete_settings(settings: BackupSettings) {
        assert!(settings.validate().is_ok());
    }

    #[rstest]
    #[case::backup_root("backup_root")]
    #[case::log_dir("log_dir")]
    #[case::ssh_key_path("ssh_key_path")]
    #[case::mail_to("mail_to")]
    fn validate_rejects_blank_fields(mut settings: BackupSettings, #[case] field: &str) {
        let slot = match field {
            "backup_root" => &mut settings.backup_root,
            "log_dir" => &mut settings.log_dir,
            "ssh_key_path" => &mut settings.ssh_key_path,
            _ => &mut settings.mail_to,
        };
        *slot = String::from("   ");

        let err = settings.validate().expect_err("blank field should fail");
        assert_eq!(
            err,
            SettingsError::MissingField {
                field: field.to_owned()
            }
        );
        let message = err.to_string();
        assert!(
            message.contains(&format!("HOSTMIRROR_{}", field.to_uppercase())),
            "error should mention env var: {message}"
        );
    }

    #[rstest]
    fn validate_rejects_zero_port(settings: BackupSettings) {
        let cfg = BackupSettings {
            smtp_port: 0,
            ..settings
        };
        assert_eq!(cfg.validate(), Err(SettingsError::InvalidPort));
    }

    #[rstest]
    fn path_accessors_wrap_configured_strings(settings: BackupSettings) {
        assert_eq!(settings.backup_root_path(), Utf8PathBuf::from("/srv/backup"));
        assert_eq!(settings.log_dir_path(), Utf8PathBuf::from("/var/log/hostmirror"));
        assert_eq!(
            settings.sources_path(),
            Utf8Path::new("/etc/hostmirror/sources.json")
        );
    }

    #[test]
    fn boolean_looking_text_value_gets_actionable_error() {
        let err = classify_load_error(String::from(
            "invalid type: found bool true, expected a string for key \"RSYNC_BIN\"",
        ));

        assert!(matches!(err, SettingsError::NonTextValue { .. }));
        let message = err.to_string();
        assert!(message.contains("RSYNC_BIN"), "message: {message}");
        assert!(message.contains("full path"), "message: {message}");
    }

    #[test]
    fn other_load_failures_stay_parse_errors() {
        let err = classify_load_error(String::from("invalid digit found in string"));
        assert_eq!(
            err,
            SettingsError::Parse(String::from("invalid digit found in string"))
        );
    }
}
