//! Uniform view of the party behind a reference.
//!
//! A general practitioner reference may point at an Organization (the practice) or a
//! Practitioner (the doctor). [`PartyView`] closes over exactly those two kinds plus
//! `Unknown`. [`resolve`] matches every resource variant explicitly, so a newly modelled
//! resource type fails to compile here until someone decides which kind it is.

use crate::constants::UNKNOWN;
use crate::index::ResourceIndex;
use fhir::{Address, ContactPoint, Organization, Practitioner, Reference, Resource};

/// A resolved party.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartyView<'a> {
    Organization(&'a Organization),
    Practitioner(&'a Practitioner),
    Unknown,
}

impl<'a> PartyView<'a> {
    pub fn is_organization(&self) -> bool {
        matches!(self, PartyView::Organization(_))
    }

    pub fn is_practitioner(&self) -> bool {
        matches!(self, PartyView::Practitioner(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, PartyView::Unknown)
    }

    /// Display name, or "Unknown".
    pub fn name(&self) -> String {
        let name = match self {
            PartyView::Organization(org) => org.name.clone(),
            PartyView::Practitioner(practitioner) => practitioner
                .name
                .first()
                .map(|n| n.as_single_string())
                .filter(|n| !n.is_empty()),
            PartyView::Unknown => None,
        };
        name.unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// First address on record.
    pub fn address(&self) -> Option<&'a Address> {
        match self {
            PartyView::Organization(org) => org.address.first(),
            PartyView::Practitioner(practitioner) => practitioner.address.first(),
            PartyView::Unknown => None,
        }
    }

    pub fn telecom(&self) -> &'a [ContactPoint] {
        match self {
            PartyView::Organization(org) => &org.telecom,
            PartyView::Practitioner(practitioner) => &practitioner.telecom,
            PartyView::Unknown => &[],
        }
    }
}

/// Classify a resource as a party.
pub fn resolve(resource: Option<&Resource>) -> PartyView<'_> {
    let Some(resource) = resource else {
        return PartyView::Unknown;
    };
    match resource {
        Resource::Organization(org) => PartyView::Organization(org),
        Resource::Practitioner(practitioner) => PartyView::Practitioner(practitioner),
        Resource::Encounter(_)
        | Resource::Patient(_)
        | Resource::Consent(_)
        | Resource::Observation(_)
        | Resource::EpisodeOfCare(_)
        | Resource::Location(_)
        | Resource::Composition(_)
        | Resource::RelatedPerson(_)
        | Resource::MedicationStatement(_)
        | Resource::AllergyIntolerance(_)
        | Resource::DiagnosticReport(_)
        | Resource::ClinicalImpression(_)
        | Resource::Appointment(_)
        | Resource::List(_)
        | Resource::Other(_) => PartyView::Unknown,
    }
}

/// Resolve a reference of any type in the index and classify the result.
pub fn resolve_reference<'a>(index: &ResourceIndex<'a>, reference: &Reference) -> PartyView<'a> {
    resolve(index.find_by_reference_any(reference))
}
