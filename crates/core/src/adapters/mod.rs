//! Concrete collaborators for the dispatch and inbound pipelines.
//!
//! - [`http::HttpBundleSource`] / [`http::FileBundleSource`]: bundle acquisition
//! - [`pdf::CommandPdfConverter`]: HTML to PDF through an external command
//! - [`mail::SmtpTransmitter`] / [`mail::OutboxTransmitter`]: outgoing email
//! - [`mail_store::FsMailStore`]: raw inbound messages on disk

pub mod http;
pub mod mail;
pub mod mail_store;
pub mod pdf;

use crate::config::AdapterConfig;
use crate::pipeline::Transmitter;
use crate::{ReportError, ReportResult};

/// Pick the transmitter the configuration asks for: SMTP relay first, then the outbox.
///
/// # Errors
///
/// Returns [`ReportError::Config`] if neither is configured or the relay cannot be set up.
pub fn transmitter_from_config(
    config: &AdapterConfig,
) -> ReportResult<Box<dyn Transmitter + Send + Sync>> {
    if let Some(smtp) = &config.smtp {
        tracing::info!(host = %smtp.host, port = smtp.port, "sending through SMTP relay");
        return Ok(Box::new(mail::SmtpTransmitter::new(smtp)?));
    }
    if let Some(dir) = &config.outbox_dir {
        tracing::info!(outbox = %dir.display(), "writing outgoing mail to outbox");
        return Ok(Box::new(mail::OutboxTransmitter::new(dir.clone())?));
    }
    Err(ReportError::Config(
        "no transmitter configured: set EMS_SMTP_HOST or EMS_OUTBOX_DIR".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_transmitter_is_config_error() {
        let err = transmitter_from_config(&AdapterConfig::default())
            .err()
            .expect("no transmitter");
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn outbox_is_used_without_smtp() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config = AdapterConfig {
            outbox_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(transmitter_from_config(&config).is_ok());
    }
}
