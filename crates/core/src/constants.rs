//! Constants used throughout the EMS report core crate.

/// Sentinel returned by projections when the underlying data is absent.
pub const UNKNOWN: &str = "Unknown";

/// Title shown at the top of every rendered report.
pub const REPORT_TITLE: &str = "Encounter Report";

/// Environment key for the sender address.
pub const SENDER_KEY: &str = "EMS_REPORT_SENDER";
/// Environment key for the recipient address list.
pub const RECIPIENT_KEY: &str = "EMS_REPORT_RECIPIENT";
/// Environment key for the subject line.
pub const SUBJECT_KEY: &str = "EMS_REPORT_SUBJECT";
/// Environment key for the plain-text body.
pub const BODY_KEY: &str = "EMS_REPORT_BODY";

pub const FHIR_BASE_URL_KEY: &str = "EMS_FHIR_BASE_URL";
pub const HTTP_TIMEOUT_KEY: &str = "EMS_HTTP_TIMEOUT_SECS";
pub const PDF_COMMAND_KEY: &str = "EMS_PDF_COMMAND";
pub const SMTP_HOST_KEY: &str = "EMS_SMTP_HOST";
pub const SMTP_PORT_KEY: &str = "EMS_SMTP_PORT";
pub const SMTP_USERNAME_KEY: &str = "EMS_SMTP_USERNAME";
pub const SMTP_PASSWORD_KEY: &str = "EMS_SMTP_PASSWORD";
pub const OUTBOX_DIR_KEY: &str = "EMS_OUTBOX_DIR";
pub const MAIL_STORE_DIR_KEY: &str = "EMS_MAIL_STORE_DIR";

/// Default bundle fetch timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Default external HTML-to-PDF command.
pub const DEFAULT_PDF_COMMAND: &str = "wkhtmltopdf";
/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Civil timezone used for every displayed date-time.
pub const DISPLAY_TIMEZONE: chrono_tz::Tz = chrono_tz::Europe::London;

/// Class attached to `<th>` elements of section tables.
pub const TABLE_HEADER_CLASS: &str = "section-table-header";

/// Element id of the patient banner in rendered reports.
pub const PATIENT_BANNER_ID: &str = "patientBanner";

/// MIME type of converted report artifacts.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Outcome strings reported by the dispatch pipeline.
pub const DISPATCH_OK: &str = "200 OK";
pub const DISPATCH_FAILED: &str = "500 Server Error";

/// Outcome strings reported by the inbound pipeline.
pub const INBOUND_OK: &str = "SUCCESS";
pub const INBOUND_FAILED: &str = "ERROR";
