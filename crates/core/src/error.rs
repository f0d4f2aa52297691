//! Error types for the encounter report core.
//!
//! Data absence is never an error here: projections degrade to sentinel values instead.
//! Every variant below is either a startup configuration problem, a structural contract
//! violation in the bundle, or a failure reported by an external collaborator. Any of them
//! aborts a dispatch.

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),

    #[error("composition has no section at index {index} ({available} sections available)")]
    MissingSection { index: usize, available: usize },
    #[error("composition has no section titled '{title}'")]
    SectionNotFound { title: String },
    #[error("bundle contains no Composition")]
    MissingComposition,
    #[error("invalid narrative XHTML: {0}")]
    Narrative(String),

    #[error("informant data missing: {0}")]
    MissingInformant(&'static str),

    #[error("cannot build attachment name: {0}")]
    AttachmentName(String),

    #[error("failed to fetch bundle: {0}")]
    Fetch(String),
    #[error("failed to render report: {0}")]
    Render(String),
    #[error("failed to convert document: {0}")]
    Convert(String),
    #[error("failed to send email: {0}")]
    Send(String),

    #[error("invalid inbound event: {0}")]
    InboundEvent(String),
    #[error("failed to read raw message: {0}")]
    MailStore(String),
    #[error("failed to parse raw message: {0}")]
    MailParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for ReportError {
    fn from(err: quick_xml::Error) -> Self {
        ReportError::Narrative(err.to_string())
    }
}

impl From<ems_types::TextError> for ReportError {
    fn from(err: ems_types::TextError) -> Self {
        ReportError::Config(err.to_string())
    }
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;
