//! Runtime configuration for report dispatch.
//!
//! Settings are resolved once at process startup and passed into the pipelines. Derivation
//! logic never reads the environment; [`EmailSettings::from_map`] and
//! [`AdapterConfig::from_map`] take an explicit key/value map so the same resolution runs in
//! tests and binaries.

use crate::constants::{
    BODY_KEY, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PDF_COMMAND, DEFAULT_SMTP_PORT,
    FHIR_BASE_URL_KEY, HTTP_TIMEOUT_KEY, MAIL_STORE_DIR_KEY, OUTBOX_DIR_KEY, PDF_COMMAND_KEY,
    RECIPIENT_KEY, SENDER_KEY, SMTP_HOST_KEY, SMTP_PASSWORD_KEY, SMTP_PORT_KEY,
    SMTP_USERNAME_KEY, SUBJECT_KEY,
};
use crate::{ReportError, ReportResult};
use ems_types::{EmailAddress, NonEmptyText};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Sender, recipients and message text for outgoing report emails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailSettings {
    sender: EmailAddress,
    recipients: Vec<EmailAddress>,
    subject: NonEmptyText,
    body: NonEmptyText,
}

impl EmailSettings {
    /// Create settings from already-validated parts.
    pub fn new(
        sender: EmailAddress,
        recipients: Vec<EmailAddress>,
        subject: NonEmptyText,
        body: NonEmptyText,
    ) -> ReportResult<Self> {
        if recipients.is_empty() {
            return Err(ReportError::Config("at least one recipient is required".into()));
        }
        Ok(Self {
            sender,
            recipients,
            subject,
            body,
        })
    }

    /// Resolve settings from a key/value map.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if any of the four keys is missing or blank, or if
    /// the sender or a recipient is not a valid address.
    pub fn from_map(values: &HashMap<String, String>) -> ReportResult<Self> {
        let sender = EmailAddress::new(required(values, SENDER_KEY)?)
            .map_err(|e| ReportError::Config(format!("{SENDER_KEY}: {e}")))?;
        let recipients = EmailAddress::parse_list(&required(values, RECIPIENT_KEY)?)
            .map_err(|e| ReportError::Config(format!("{RECIPIENT_KEY}: {e}")))?;
        let subject = NonEmptyText::new(required(values, SUBJECT_KEY)?)?;
        let body = NonEmptyText::new(required(values, BODY_KEY)?)?;

        Self::new(sender, recipients, subject, body)
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> ReportResult<Self> {
        Self::from_map(&std::env::vars().collect())
    }

    pub fn sender(&self) -> &EmailAddress {
        &self.sender
    }

    pub fn recipients(&self) -> &[EmailAddress] {
        &self.recipients
    }

    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    pub fn body(&self) -> &str {
        self.body.as_str()
    }
}

fn required(values: &HashMap<String, String>, key: &str) -> ReportResult<String> {
    values
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ReportError::Config(format!("{key} is not set")))
}

fn optional(values: &HashMap<String, String>, key: &str) -> Option<String> {
    values
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Adapter configuration
// ============================================================================

/// SMTP relay settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Settings for the concrete collaborators, all optional with defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterConfig {
    pub fhir_base_url: Option<String>,
    pub http_timeout: Duration,
    pub pdf_command: String,
    pub smtp: Option<SmtpSettings>,
    pub outbox_dir: Option<PathBuf>,
    pub mail_store_dir: Option<PathBuf>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            fhir_base_url: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            pdf_command: DEFAULT_PDF_COMMAND.to_string(),
            smtp: None,
            outbox_dir: None,
            mail_store_dir: None,
        }
    }
}

impl AdapterConfig {
    /// Resolve adapter settings from a key/value map.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Config`] if a numeric setting does not parse.
    pub fn from_map(values: &HashMap<String, String>) -> ReportResult<Self> {
        let http_timeout = match optional(values, HTTP_TIMEOUT_KEY) {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|_| {
                ReportError::Config(format!("{HTTP_TIMEOUT_KEY} must be a number of seconds"))
            })?),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let smtp = match optional(values, SMTP_HOST_KEY) {
            Some(host) => {
                let port = match optional(values, SMTP_PORT_KEY) {
                    Some(raw) => raw.parse().map_err(|_| {
                        ReportError::Config(format!("{SMTP_PORT_KEY} must be a port number"))
                    })?,
                    None => DEFAULT_SMTP_PORT,
                };
                Some(SmtpSettings {
                    host,
                    port,
                    username: optional(values, SMTP_USERNAME_KEY),
                    password: optional(values, SMTP_PASSWORD_KEY),
                })
            }
            None => None,
        };

        Ok(Self {
            fhir_base_url: optional(values, FHIR_BASE_URL_KEY)
                .map(|url| url.trim_end_matches('/').to_string()),
            http_timeout,
            pdf_command: optional(values, PDF_COMMAND_KEY)
                .unwrap_or_else(|| DEFAULT_PDF_COMMAND.to_string()),
            smtp,
            outbox_dir: optional(values, OUTBOX_DIR_KEY).map(PathBuf::from),
            mail_store_dir: optional(values, MAIL_STORE_DIR_KEY).map(PathBuf::from),
        })
    }

    /// Resolve adapter settings from the process environment.
    pub fn from_env() -> ReportResult<Self> {
        Self::from_map(&std::env::vars().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_values() -> HashMap<String, String> {
        HashMap::from([
            (SENDER_KEY.to_string(), "reports@ems.example".to_string()),
            (
                RECIPIENT_KEY.to_string(),
                "gp@medway.example, audit@ems.example".to_string(),
            ),
            (SUBJECT_KEY.to_string(), "Encounter report".to_string()),
            (BODY_KEY.to_string(), "Please find the report attached.".to_string()),
        ])
    }

    #[test]
    fn resolves_email_settings() {
        let settings = EmailSettings::from_map(&email_values()).expect("valid settings");
        assert_eq!(settings.sender().as_str(), "reports@ems.example");
        assert_eq!(settings.recipients().len(), 2);
        assert_eq!(settings.recipients()[1].as_str(), "audit@ems.example");
        assert_eq!(settings.subject(), "Encounter report");
    }

    #[test]
    fn missing_or_blank_key_is_config_error() {
        for key in [SENDER_KEY, RECIPIENT_KEY, SUBJECT_KEY, BODY_KEY] {
            let mut values = email_values();
            values.remove(key);
            let err = EmailSettings::from_map(&values).expect_err("missing key");
            match err {
                ReportError::Config(msg) => assert!(msg.contains(key)),
                other => panic!("expected Config, got {other:?}"),
            }

            let mut values = email_values();
            values.insert(key.to_string(), "   ".to_string());
            assert!(EmailSettings::from_map(&values).is_err());
        }
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let mut values = email_values();
        values.insert(SENDER_KEY.to_string(), "not-an-address".to_string());
        let err = EmailSettings::from_map(&values).expect_err("invalid sender");
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn adapter_defaults_apply() {
        let config = AdapterConfig::from_map(&HashMap::new()).expect("defaults");
        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.pdf_command, "wkhtmltopdf");
        assert!(config.smtp.is_none());
    }

    #[test]
    fn adapter_settings_parse() {
        let values = HashMap::from([
            (FHIR_BASE_URL_KEY.to_string(), "http://fhir.local/".to_string()),
            (HTTP_TIMEOUT_KEY.to_string(), "5".to_string()),
            (SMTP_HOST_KEY.to_string(), "smtp.local".to_string()),
            (SMTP_PORT_KEY.to_string(), "2525".to_string()),
            (OUTBOX_DIR_KEY.to_string(), "/tmp/outbox".to_string()),
        ]);
        let config = AdapterConfig::from_map(&values).expect("valid");
        assert_eq!(config.fhir_base_url.as_deref(), Some("http://fhir.local"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        let smtp = config.smtp.expect("smtp configured");
        assert_eq!(smtp.port, 2525);
        assert!(smtp.username.is_none());
        assert_eq!(config.outbox_dir, Some(PathBuf::from("/tmp/outbox")));
    }

    #[test]
    fn bad_port_is_config_error() {
        let values = HashMap::from([
            (SMTP_HOST_KEY.to_string(), "smtp.local".to_string()),
            (SMTP_PORT_KEY.to_string(), "many".to_string()),
        ]);
        let err = AdapterConfig::from_map(&values).expect_err("bad port");
        assert!(matches!(err, ReportError::Config(_)));
    }
}
