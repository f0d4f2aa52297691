//! Outgoing report emails.

use crate::config::EmailSettings;
use crate::constants::PDF_CONTENT_TYPE;
use crate::{ReportError, ReportResult};
use ems_types::EmailAddress;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;

/// Everything the transmitter needs to send one report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub sender: EmailAddress,
    pub recipients: Vec<EmailAddress>,
    pub subject: String,
    pub body: String,
    pub attachment: Vec<u8>,
    pub filename: String,
}

impl OutgoingEmail {
    pub fn new(settings: &EmailSettings, attachment: Vec<u8>, filename: String) -> Self {
        Self {
            sender: settings.sender().clone(),
            recipients: settings.recipients().to_vec(),
            subject: settings.subject().to_string(),
            body: settings.body().to_string(),
            attachment,
            filename,
        }
    }

    /// Build a `multipart/mixed` message: plain-text body then the PDF attachment.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Send`] if an address is rejected by the message builder.
    pub fn to_message(&self) -> ReportResult<Message> {
        let mut builder = Message::builder()
            .from(mailbox(&self.sender)?)
            .subject(self.subject.clone());
        for recipient in &self.recipients {
            builder = builder.to(mailbox(recipient)?);
        }

        let content_type = ContentType::parse(PDF_CONTENT_TYPE)
            .map_err(|e| ReportError::Send(format!("invalid attachment type: {e}")))?;
        let attachment =
            Attachment::new(self.filename.clone()).body(self.attachment.clone(), content_type);

        builder
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(self.body.clone()))
                    .singlepart(attachment),
            )
            .map_err(|e| ReportError::Send(format!("failed to build message: {e}")))
    }
}

fn mailbox(address: &EmailAddress) -> ReportResult<Mailbox> {
    address
        .as_str()
        .parse()
        .map_err(|e| ReportError::Send(format!("invalid address {address}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ems_types::NonEmptyText;

    fn settings() -> EmailSettings {
        EmailSettings::new(
            EmailAddress::new("reports@ems.example").expect("valid"),
            EmailAddress::parse_list("gp@medway.example,audit@ems.example").expect("valid"),
            NonEmptyText::new("Encounter report").expect("valid"),
            NonEmptyText::new("Report attached.").expect("valid"),
        )
        .expect("valid settings")
    }

    #[test]
    fn copies_settings() {
        let email = OutgoingEmail::new(&settings(), vec![1, 2, 3], "a.pdf".into());
        assert_eq!(email.recipients.len(), 2);
        assert_eq!(email.subject, "Encounter report");
        assert_eq!(email.attachment, vec![1, 2, 3]);
    }

    #[test]
    fn builds_mixed_message_with_attachment() {
        let email = OutgoingEmail::new(
            &settings(),
            b"%PDF-1.4".to_vec(),
            "993254128_BLOGGS_20100215.pdf".into(),
        );
        let message = email.to_message().expect("message builds");
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(raw.contains("Subject: Encounter report"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("application/pdf"));
        assert!(raw.contains("993254128_BLOGGS_20100215.pdf"));
        assert!(raw.contains("Report attached."));
        assert!(raw.contains("gp@medway.example"));
        assert!(raw.contains("audit@ems.example"));
    }
}
