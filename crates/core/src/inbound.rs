//! Inbound re-send path.
//!
//! A notification names a raw email held in the mail store. The pipeline fetches it, takes
//! the HTML report it carries (the first attachment, else the first `text/html` part),
//! converts it, names the attachment from the report's patient banner and sends it on.

use crate::config::EmailSettings;
use crate::constants::{INBOUND_FAILED, INBOUND_OK};
use crate::email::OutgoingEmail;
use crate::naming;
use crate::pipeline::{stage, DocumentConverter, Transmitter};
use crate::stopwatch::StagedStopwatch;
use crate::{ReportError, ReportResult};
use mailparse::{DispositionType, ParsedMail};
use serde::Deserialize;

// ============================================================================
// Notification
// ============================================================================

/// Where a raw message is held.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailLocation {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnsEnvelope {
    #[serde(default)]
    records: Vec<SnsRecord>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnsRecord {
    sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SnsMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReceiptNotification {
    receipt: Option<Receipt>,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    action: Option<ReceiptAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptAction {
    bucket_name: Option<String>,
    object_key: Option<String>,
}

/// Locate the raw message named by a notification.
///
/// Accepts either a batch (`{"Records": [{"Sns": {"Message": ...}}]}`, first record used) or
/// a single notification (`{"Message": ...}`). The message is itself a JSON receipt
/// carrying `receipt.action.bucketName` and `receipt.action.objectKey`.
///
/// # Errors
///
/// Returns [`ReportError::InboundEvent`] if the JSON is malformed or a field is missing.
pub fn parse_notification(json: &str) -> ReportResult<MailLocation> {
    let envelope: SnsEnvelope = serde_json::from_str(json)
        .map_err(|e| ReportError::InboundEvent(format!("invalid notification: {e}")))?;

    let message = match envelope.records.into_iter().next() {
        Some(record) => record.sns.message,
        None => envelope
            .message
            .ok_or_else(|| ReportError::InboundEvent("notification has no message".into()))?,
    };

    let receipt: ReceiptNotification = serde_json::from_str(&message)
        .map_err(|e| ReportError::InboundEvent(format!("invalid receipt: {e}")))?;
    let action = receipt
        .receipt
        .and_then(|r| r.action)
        .ok_or_else(|| ReportError::InboundEvent("receipt has no action".into()))?;

    Ok(MailLocation {
        bucket: action
            .bucket_name
            .ok_or_else(|| ReportError::InboundEvent("receipt action has no bucketName".into()))?,
        key: action
            .object_key
            .ok_or_else(|| ReportError::InboundEvent("receipt action has no objectKey".into()))?,
    })
}

// ============================================================================
// Mail store and MIME
// ============================================================================

/// Raw message storage.
pub trait MailStore {
    fn fetch(&self, location: &MailLocation) -> ReportResult<Vec<u8>>;
}

fn find_part<'m, 'a>(
    mail: &'m ParsedMail<'a>,
    accept: &dyn Fn(&ParsedMail<'_>) -> bool,
) -> Option<&'m ParsedMail<'a>> {
    if accept(mail) {
        return Some(mail);
    }
    mail.subparts.iter().find_map(|part| find_part(part, accept))
}

/// HTML carried by a raw message.
///
/// # Errors
///
/// Returns [`ReportError::MailParse`] if the message does not parse or carries neither an
/// attachment nor an HTML part.
pub fn extract_html(raw: &[u8]) -> ReportResult<String> {
    let mail = mailparse::parse_mail(raw).map_err(|e| ReportError::MailParse(e.to_string()))?;

    let is_attachment = |part: &ParsedMail<'_>| {
        part.subparts.is_empty()
            && part.get_content_disposition().disposition == DispositionType::Attachment
    };
    let is_html = |part: &ParsedMail<'_>| {
        part.subparts.is_empty() && part.ctype.mimetype.eq_ignore_ascii_case("text/html")
    };

    let part = find_part(&mail, &is_attachment)
        .or_else(|| find_part(&mail, &is_html))
        .ok_or_else(|| ReportError::MailParse("message has no attachment or HTML part".into()))?;

    part.get_body()
        .map_err(|e| ReportError::MailParse(e.to_string()))
}

// ============================================================================
// Pipeline
// ============================================================================

/// Result of one inbound run.
#[derive(Debug)]
pub enum InboundOutcome {
    Sent { filename: String },
    Failed { stage: &'static str, error: ReportError },
}

impl InboundOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InboundOutcome::Sent { .. })
    }

    /// "SUCCESS" or "ERROR".
    pub fn status_line(&self) -> &'static str {
        if self.is_success() {
            INBOUND_OK
        } else {
            INBOUND_FAILED
        }
    }
}

pub struct InboundPipeline {
    settings: EmailSettings,
    store: Box<dyn MailStore + Send + Sync>,
    converter: Box<dyn DocumentConverter + Send + Sync>,
    transmitter: Box<dyn Transmitter + Send + Sync>,
}

impl InboundPipeline {
    pub fn new(
        settings: EmailSettings,
        store: impl MailStore + Send + Sync + 'static,
        converter: impl DocumentConverter + Send + Sync + 'static,
        transmitter: impl Transmitter + Send + Sync + 'static,
    ) -> Self {
        Self {
            settings,
            store: Box::new(store),
            converter: Box::new(converter),
            transmitter: Box::new(transmitter),
        }
    }

    pub fn process(&self, notification: &str) -> InboundOutcome {
        let mut stopwatch = StagedStopwatch::start();
        let result = self.run(notification, &mut stopwatch);
        let total_ms = stopwatch.total().as_millis() as u64;

        match result {
            Ok(filename) => {
                tracing::info!(filename = %filename, total_ms, "inbound report re-sent");
                InboundOutcome::Sent { filename }
            }
            Err((stage, error)) => {
                tracing::error!(
                    stage,
                    stages = ?stopwatch.stage_names(),
                    total_ms,
                    error = %error,
                    "inbound report aborted"
                );
                InboundOutcome::Failed { stage, error }
            }
        }
    }

    fn run(
        &self,
        notification: &str,
        stopwatch: &mut StagedStopwatch,
    ) -> Result<String, (&'static str, ReportError)> {
        let location = stage(stopwatch, "reading notification", || {
            parse_notification(notification)
        })?;
        tracing::debug!(bucket = %location.bucket, key = %location.key, "raw message located");

        let raw = stage(stopwatch, "retrieving email", || {
            self.store.fetch(&location)
        })?;

        let html = stage(stopwatch, "extracting attachment", || extract_html(&raw))?;

        let pdf = stage(stopwatch, "pdf transformation", || {
            self.converter.convert(&html)
        })?;

        let filename = stage(stopwatch, "naming attachment", || {
            naming::name_from_banner(&html)
        })?;

        stage(stopwatch, "sending email", || {
            let email = OutgoingEmail::new(&self.settings, pdf, filename.clone());
            self.transmitter.send(&email)
        })?;

        Ok(filename)
    }
}
