//! FHIR wire/boundary support for the encounter report service.
//!
//! This crate provides **wire models** and **parsing helpers** for the FHIR STU3 JSON
//! bundles returned by the clinical-data server:
//! - resources and datatypes read by the encounter report
//! - bundle decoding with field-path diagnostics
//! - reference string parsing
//!
//! This crate focuses on:
//! - serialisation/deserialisation
//! - tolerant decoding (unmodelled fields and resource types are kept out of the way rather
//!   than rejected)
//!
//! Resolution of references into a navigable graph belongs in `ems-core`.

pub mod bundle;
pub mod datatypes;
pub mod reference;
pub mod resources;

// Re-export facades
pub use bundle::{Bundle, BundleEntry};
pub use reference::{id_part, parse_reference, ParsedReference};
pub use resources::{Resource, ResourceType};

// Re-export datatypes and resource models
pub use datatypes::{
    Address, Annotation, CodeableConcept, Coding, ContactPoint, Dosage, Extension, FhirDateTime,
    HumanName, Identifier, Meta, Narrative, Period, Reference, NHS_NUMBER_SYSTEM,
    NHS_NUMBER_VERIFICATION_EXTENSION,
};
pub use resources::{
    AllergyIntolerance, Appointment, ClinicalImpression, Composition, CompositionSection, Consent,
    DiagnosticReport, Encounter, EncounterLocation, EpisodeOfCare, ListEntry, ListResource,
    Location, MedicationStatement, Observation, Organization, OtherResource, Patient,
    Practitioner, RelatedPerson,
};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
