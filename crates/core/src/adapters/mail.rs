//! Outgoing email transports.

use crate::config::SmtpSettings;
use crate::email::OutgoingEmail;
use crate::pipeline::Transmitter;
use crate::{ReportError, ReportResult};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{FileTransport, SmtpTransport, Transport};
use std::path::PathBuf;

/// Sends through an SMTP relay (STARTTLS).
#[derive(Clone)]
pub struct SmtpTransmitter {
    transport: SmtpTransport,
}

impl SmtpTransmitter {
    pub fn new(settings: &SmtpSettings) -> ReportResult<Self> {
        let mut builder = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| ReportError::Config(format!("invalid SMTP relay: {e}")))?
            .port(settings.port);

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl Transmitter for SmtpTransmitter {
    fn send(&self, email: &OutgoingEmail) -> ReportResult<()> {
        let message = email.to_message()?;
        let response = self
            .transport
            .send(&message)
            .map_err(|e| ReportError::Send(e.to_string()))?;
        tracing::debug!(code = %response.code(), "relay accepted message");
        Ok(())
    }
}

/// Writes each message to `<dir>/<id>.eml` instead of sending it.
#[derive(Clone, Debug)]
pub struct OutboxTransmitter {
    dir: PathBuf,
}

impl OutboxTransmitter {
    pub fn new(dir: PathBuf) -> ReportResult<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl Transmitter for OutboxTransmitter {
    fn send(&self, email: &OutgoingEmail) -> ReportResult<()> {
        let message = email.to_message()?;
        let id = FileTransport::new(&self.dir)
            .send(&message)
            .map_err(|e| ReportError::Send(e.to_string()))?;
        tracing::info!(id = %id, outbox = %self.dir.display(), "message written to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::email_settings;

    #[test]
    fn outbox_writes_eml() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let outbox = OutboxTransmitter::new(dir.path().join("outbox")).expect("outbox");
        let email = OutgoingEmail::new(
            &email_settings(),
            b"%PDF-1.4".to_vec(),
            "993254128_BLOGGS_20100215.pdf".into(),
        );
        outbox.send(&email).expect("written");

        let files: Vec<_> = std::fs::read_dir(dir.path().join("outbox"))
            .expect("read dir")
            .map(|e| e.expect("entry").path())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].extension().and_then(|e| e.to_str()), Some("eml"));

        let raw = std::fs::read_to_string(&files[0]).expect("read eml");
        assert!(raw.contains("993254128_BLOGGS_20100215.pdf"));
    }

    #[test]
    fn smtp_transmitter_builds_without_connecting() {
        let settings = SmtpSettings {
            host: "smtp.example".into(),
            port: 2525,
            username: Some("user".into()),
            password: Some("secret".into()),
        };
        assert!(SmtpTransmitter::new(&settings).is_ok());
    }
}
