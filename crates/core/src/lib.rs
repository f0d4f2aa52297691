//! # EMS Core
//!
//! Core logic for the EMS encounter report service.
//!
//! This crate turns a FHIR bundle into an encounter report and delivers it:
//! - [`index::ResourceIndex`]: typed lookup and reference resolution over one bundle
//! - [`report::EncounterReport`]: the report projection, with "Unknown" fallbacks
//! - [`party`]: organization / practitioner resolution behind one view
//! - [`naming`]: attachment filenames
//! - [`pipeline::DispatchPipeline`] and [`inbound::InboundPipeline`]: staged delivery
//!
//! **No API concerns**: HTTP servers and the operator CLI live in `ems-run` and `ems-cli`.
//! Configuration is resolved by the binaries at startup and passed in.

pub mod adapters;
pub mod config;
pub mod constants;
pub mod dates;
pub mod email;
pub mod error;
pub mod inbound;
pub mod index;
pub mod naming;
pub mod narrative;
pub mod party;
pub mod patient;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod sections;
pub mod stopwatch;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{AdapterConfig, EmailSettings, SmtpSettings};
pub use email::OutgoingEmail;
pub use error::{ReportError, ReportResult};
pub use inbound::{InboundOutcome, InboundPipeline, MailLocation, MailStore};
pub use index::ResourceIndex;
pub use party::PartyView;
pub use patient::{PatientIdentifierView, PatientView};
pub use pipeline::{
    BundleSource, DispatchOutcome, DispatchPipeline, DocumentConverter, ReportRenderer,
    Transmitter,
};
pub use render::HtmlReportRenderer;
pub use report::{
    AppointmentView, ContactPoints, EncounterReport, InformantHomeAddress, ReportSummary,
};
pub use sections::{ReportSection, SectionLayout, SectionView};
