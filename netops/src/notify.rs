//! Email delivery of run logs.
//!
//! Messages are plain-text bodies with file attachments, sent through the
//! relay in `[smtp]` over cleartext, STARTTLS or SMTPS.

use std::fs;
use std::path::{Path, PathBuf};

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{debug, info};
use secrecy::ExposeSecret;

use crate::error::{NotifyError, Result};
use crate::settings::{SmtpSecurity, SmtpSettings};

/// Subject of every netops email.
pub const SUBJECT: &str = "Netops";

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// An email to send.
#[derive(Debug, Clone)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

impl Email {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: SUBJECT.to_string(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }
}

/// SMTP client for one relay.
#[derive(Debug, Clone)]
pub struct Mailer {
    smtp: SmtpSettings,
}

impl Mailer {
    pub fn new(smtp: &SmtpSettings) -> Self {
        Self { smtp: smtp.clone() }
    }

    /// Assemble the MIME message. Every attachment is read here, so an
    /// unreadable file fails before anything is sent.
    pub fn build_message(&self, email: &Email) -> Result<Message> {
        let from = parse_mailbox(&self.smtp.from)?;
        let to = parse_mailbox(&email.to)?;

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
        for path in &email.attachments {
            parts = parts.singlepart(attachment(path)?);
        }

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.as_str())
            .date_now()
            .multipart(parts)
            .map_err(NotifyError::from)?;
        Ok(message)
    }

    fn transport(&self) -> Result<SmtpTransport> {
        let server = self.smtp.server.as_str();
        let builder = match self.smtp.security {
            SmtpSecurity::Ssl => SmtpTransport::relay(server).map_err(NotifyError::from)?,
            SmtpSecurity::Starttls => {
                SmtpTransport::starttls_relay(server).map_err(NotifyError::from)?
            }
            SmtpSecurity::Plain => SmtpTransport::builder_dangerous(server),
        };
        let mut builder = builder.port(self.smtp.port());

        if let Some(user) = &self.smtp.user {
            let password = self
                .smtp
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            builder = builder.credentials(Credentials::new(user.clone(), password));
        }
        Ok(builder.build())
    }

    /// Build and send `email`.
    pub fn send(&self, email: &Email) -> Result<()> {
        let message = self.build_message(email)?;
        debug!(
            "sending '{}' to {} via {}:{} ({:?})",
            email.subject,
            email.to,
            self.smtp.server,
            self.smtp.port(),
            self.smtp.security
        );
        self.transport()?
            .send(&message)
            .map_err(NotifyError::from)?;
        info!("mail sent to {}", email.to);
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address.trim().parse().map_err(|source| {
        NotifyError::Address {
            address: address.to_string(),
            source,
        }
        .into()
    })
}

fn attachment(path: &Path) -> Result<SinglePart> {
    let data = fs::read(path).map_err(|source| NotifyError::Attachment {
        path: path.to_path_buf(),
        source,
    })?;
    info!("attaching {} ({})", path.display(), format_size(data.len() as u64));

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => ContentType::TEXT_HTML,
        Some("txt" | "log") => ContentType::TEXT_PLAIN,
        _ => ContentType::parse("application/octet-stream").map_err(NotifyError::from)?,
    };
    Ok(Attachment::new(filename).body(data, content_type))
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.1} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::settings::Settings;
    use tempfile::TempDir;

    fn mailer() -> Mailer {
        let settings = Settings::from_toml(
            "[general]\ninventory_dir = \"/tmp\"\noutput_dir = \"/tmp\"\n\n\
             [smtp]\nserver = \"mail.example.net\"\nfrom = \"netops@example.net\"\n",
        )
        .unwrap();
        Mailer::new(&settings.smtp)
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(3 * MB), "3.0 MiB");
        assert_eq!(format_size(2 * GB), "2.0 GiB");
    }

    #[test]
    fn test_message_with_attachment() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("usercfg_20240101-120000.html");
        fs::write(&log, "<pre>commit complete</pre>").unwrap();

        let email = Email::new("noc@example.net", "This is the result of the script you ran").attach(&log);
        let message = mailer().build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Netops"));
        assert!(raw.contains("To: noc@example.net"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("filename=\"usercfg_20240101-120000.html\""));
        assert!(raw.contains("This is the result of the script you ran"));
    }

    #[test]
    fn test_missing_attachment_is_fatal() {
        let dir = TempDir::new().unwrap();
        let email = Email::new("noc@example.net", "body").attach(dir.path().join("missing.html"));
        assert!(matches!(
            mailer().build_message(&email),
            Err(Error::Notify(NotifyError::Attachment { .. }))
        ));
    }

    #[test]
    fn test_invalid_recipient() {
        let email = Email::new("not an address", "body");
        let err = mailer().build_message(&email).unwrap_err();
        assert!(matches!(err, Error::Notify(NotifyError::Address { .. })));
        assert!(err.to_string().contains("not an address"));
    }
}
