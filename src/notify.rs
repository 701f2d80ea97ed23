//! Failure notification through the local mail relay.
//!
//! Delivery is best effort. [`Notifier::notify`] reports failures so the
//! caller can log them, but nothing in a backup run depends on a message
//! actually reaching the operator.

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::plan::BackupJob;
use crate::settings::BackupSettings;

/// Prefix of every failure subject line.
pub const SUBJECT_PREFIX: &str = "From Host, Rsync Failed";

/// Errors raised while building or delivering a notification.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum NotificationError {
    /// Raised when a configured mail address cannot be parsed.
    #[error("invalid {field} address '{value}': {message}")]
    Address {
        /// Setting holding the address.
        field: String,
        /// Rejected value.
        value: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when the message cannot be assembled.
    #[error("failed to build notification: {0}")]
    Build(String),
    /// Raised when the relay refuses the message or cannot be reached.
    #[error("failed to send notification: {0}")]
    Delivery(String),
}

/// One failure alert.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FailureNotification {
    /// Subject line naming the failed source.
    pub subject: String,
    /// Plain-text body carrying the captured error.
    pub body: String,
}

impl FailureNotification {
    /// Builds the alert for `job` with the failure message as its body.
    #[must_use]
    pub fn for_job(job: &BackupJob, body: impl Into<String>) -> Self {
        Self {
            subject: format!("{SUBJECT_PREFIX}: {}", job.source_label()),
            body: body.into(),
        }
    }
}

/// Sends failure alerts.
pub trait Notifier {
    /// Delivers a single notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] when the message cannot be built or
    /// delivered. Callers may ignore the error.
    fn notify(&self, notification: &FailureNotification) -> Result<(), NotificationError>;
}

/// Plain SMTP notifier; opens one relay connection per message.
///
/// An unparseable sender or recipient does not stop a backup run: the
/// notifier is still built, and every [`Notifier::notify`] call reports the
/// address error instead of contacting the relay.
#[derive(Clone, Debug)]
pub struct SmtpNotifier {
    addresses: Result<Envelope, NotificationError>,
    relay_host: String,
    relay_port: u16,
}

#[derive(Clone, Debug)]
struct Envelope {
    from: Mailbox,
    to: Mailbox,
}

impl SmtpNotifier {
    /// Creates a notifier for the given addresses and relay.
    #[must_use]
    pub fn new(
        mail_from: &str,
        mail_to: &str,
        relay_host: impl Into<String>,
        relay_port: u16,
    ) -> Self {
        let addresses = parse_mailbox("mail_from", mail_from).and_then(|from| {
            parse_mailbox("mail_to", mail_to).map(|to| Envelope { from, to })
        });
        Self {
            addresses,
            relay_host: relay_host.into(),
            relay_port,
        }
    }

    /// Creates a notifier from the run settings.
    #[must_use]
    pub fn from_settings(settings: &BackupSettings) -> Self {
        Self::new(
            &settings.mail_from,
            &settings.mail_to,
            settings.smtp_host.clone(),
            settings.smtp_port,
        )
    }

    /// Returns the address error that disables delivery, if any.
    #[must_use]
    pub fn address_error(&self) -> Option<&NotificationError> {
        self.addresses.as_ref().err()
    }

    pub(crate) fn build_message(
        &self,
        notification: &FailureNotification,
    ) -> Result<Message, NotificationError> {
        let envelope = self.addresses.as_ref().map_err(Clone::clone)?;
        Message::builder()
            .from(envelope.from.clone())
            .to(envelope.to.clone())
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body.clone())
            .map_err(|err| NotificationError::Build(err.to_string()))
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, notification: &FailureNotification) -> Result<(), NotificationError> {
        let message = self.build_message(notification)?;
        let mailer = SmtpTransport::builder_dangerous(self.relay_host.as_str())
            .port(self.relay_port)
            .build();

        mailer
            .send(&message)
            .map(|_| ())
            .map_err(|err| NotificationError::Delivery(err.to_string()))
    }
}

fn parse_mailbox(field: &str, value: &str) -> Result<Mailbox, NotificationError> {
    value
        .trim()
        .parse::<Mailbox>()
        .map_err(|err| NotificationError::Address {
            field: field.to_owned(),
            value: value.to_owned(),
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PathPlanner;
    use std::net::TcpListener;

    fn notification() -> FailureNotification {
        let job = PathPlanner::new("/backup", "/logs").job_for("h1", "/data/");
        FailureNotification::for_job(&job, "Rsync failed\npermission denied\n")
    }

    #[test]
    fn subject_names_host_and_directory() {
        assert_eq!(
            notification().subject,
            "From Host, Rsync Failed: h1:/data"
        );
    }

    #[test]
    fn invalid_sender_is_reported_by_every_notify() {
        let notifier = SmtpNotifier::new("not an address", "ops@example.org", "localhost", 25);
        assert!(notifier.address_error().is_some());

        for _ in 0..2 {
            let err = notifier
                .notify(&notification())
                .expect_err("sender should be rejected");
            assert!(
                matches!(err, NotificationError::Address { ref field, .. } if field == "mail_from"),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn invalid_recipient_names_mail_to() {
        let notifier = SmtpNotifier::new("backup@example.org", "ops team", "localhost", 25);
        let err = notifier.address_error().expect("recipient should be rejected");
        assert!(
            matches!(err, NotificationError::Address { field, value, .. }
                if field == "mail_to" && value == "ops team"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn build_message_is_plain_text_with_subject() {
        let notifier = SmtpNotifier::new("backup@example.org", "ops@example.org", "localhost", 25);
        assert!(notifier.address_error().is_none());
        let message = notifier.build_message(&notification()).expect("message");
        let rendered = String::from_utf8(message.formatted()).expect("utf8 message");

        assert!(rendered.contains("Subject: From Host, Rsync Failed: h1:/data"));
        assert!(rendered.contains("Content-Type: text/plain"));
        assert!(rendered.contains("permission denied"));
    }

    #[test]
    fn notify_reports_unreachable_relay() {
        // Bind then drop a listener to obtain a port with nothing behind it.
        let port = TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .map(|addr| addr.port())
            .expect("ephemeral port");
        let notifier = SmtpNotifier::new("backup@example.org", "ops@example.org", "127.0.0.1", port);

        let err = notifier
            .notify(&notification())
            .expect_err("nothing listens on the port");
        assert!(matches!(err, NotificationError::Delivery(_)), "got {err}");
    }
}
