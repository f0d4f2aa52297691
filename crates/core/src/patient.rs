//! Patient demographics as shown on the report banner.

use crate::constants::UNKNOWN;
use crate::dates::format_date;
use crate::index::ResourceIndex;
use crate::party::{self, PartyView};
use fhir::{
    Address, ContactPoint, Identifier, Patient, NHS_NUMBER_SYSTEM,
    NHS_NUMBER_VERIFICATION_EXTENSION,
};

const VERIFIED_CODE: &str = "01";
const UNVERIFIED_CODE: &str = "02";

/// Read-only view over an optional Patient.
///
/// A missing patient is valid: every accessor then returns its sentinel.
#[derive(Clone, Copy, Debug)]
pub struct PatientView<'a> {
    patient: Option<&'a Patient>,
    index: &'a ResourceIndex<'a>,
}

impl<'a> PatientView<'a> {
    pub fn new(patient: Option<&'a Patient>, index: &'a ResourceIndex<'a>) -> Self {
        Self { patient, index }
    }

    pub fn patient(&self) -> Option<&'a Patient> {
        self.patient
    }

    pub fn is_resolved(&self) -> bool {
        self.patient.is_some()
    }

    pub fn name(&self) -> String {
        self.patient
            .and_then(|p| p.name.first())
            .map(|n| n.as_single_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn family_name(&self) -> Option<&'a str> {
        self.patient
            .and_then(|p| p.name.first())
            .and_then(|n| n.family.as_deref())
    }

    pub fn birth_date(&self) -> Option<&'a str> {
        self.patient.and_then(|p| p.birth_date.as_deref())
    }

    /// Birth date as `dd-MMM-yyyy`.
    pub fn born(&self) -> String {
        format_date(self.birth_date())
    }

    pub fn gender(&self) -> String {
        let display = match self.patient.and_then(|p| p.gender.as_deref()) {
            Some("male") => "Male",
            Some("female") => "Female",
            Some("other") => "Other",
            _ => UNKNOWN,
        };
        display.to_string()
    }

    pub fn identifiers(&self) -> Vec<PatientIdentifierView<'a>> {
        self.patient
            .map(|p| p.identifier.iter().map(PatientIdentifierView::new).collect())
            .unwrap_or_default()
    }

    pub fn address(&self) -> &'a [Address] {
        self.patient.map(|p| p.address.as_slice()).unwrap_or_default()
    }

    pub fn telecom(&self) -> &'a [ContactPoint] {
        self.patient.map(|p| p.telecom.as_slice()).unwrap_or_default()
    }

    /// General practitioners that resolve in the bundle, as organizations or practitioners.
    pub fn general_practitioner(&self) -> Vec<PartyView<'a>> {
        let Some(patient) = self.patient else {
            return Vec::new();
        };
        patient
            .general_practitioner
            .iter()
            .map(|reference| party::resolve_reference(self.index, reference))
            .filter(|party| !party.is_unknown())
            .collect()
    }
}

/// One patient identifier with NHS number helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatientIdentifierView<'a> {
    identifier: &'a Identifier,
}

impl<'a> PatientIdentifierView<'a> {
    pub fn new(identifier: &'a Identifier) -> Self {
        Self { identifier }
    }

    pub fn value(&self) -> &'a str {
        self.identifier.value.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn is_nhs_number(&self) -> bool {
        self.identifier.system.as_deref() == Some(NHS_NUMBER_SYSTEM)
            || self
                .identifier
                .extension(NHS_NUMBER_VERIFICATION_EXTENSION)
                .is_some()
    }

    /// NHS number grouped as `NNNN NNN NNN`, or "Unknown" for other identifiers.
    pub fn nhs_number(&self) -> String {
        match (self.is_nhs_number(), self.identifier.value.as_deref()) {
            (true, Some(value)) => group_nhs_number(value),
            _ => UNKNOWN.to_string(),
        }
    }

    pub fn verified(&self) -> bool {
        self.verification_code() == Some(VERIFIED_CODE)
    }

    pub fn unverified(&self) -> bool {
        self.verification_code() == Some(UNVERIFIED_CODE)
    }

    /// Locally assigned, i.e. not an NHS number.
    pub fn local(&self) -> bool {
        !self.is_nhs_number()
    }

    fn verification_code(&self) -> Option<&'a str> {
        self.identifier
            .extension(NHS_NUMBER_VERIFICATION_EXTENSION)?
            .value_codeable_concept
            .as_ref()?
            .first_coding()?
            .code
            .as_deref()
    }
}

fn group_nhs_number(value: &str) -> String {
    if value.chars().count() < 7 {
        return value.to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    let grouped = format!(
        "{} {} {}",
        chars[..4].iter().collect::<String>(),
        chars[4..7].iter().collect::<String>(),
        chars[7..].iter().collect::<String>()
    );
    grouped.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_bundle;
    use fhir::{Bundle, CodeableConcept, Coding, Extension, Reference, Resource};

    fn fixture_patient<'a>(index: &'a ResourceIndex<'a>) -> PatientView<'a> {
        PatientView::new(index.find_first::<Patient>(), index)
    }

    #[test]
    fn banner_fields() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        let patient = fixture_patient(&index);
        assert_eq!(patient.name(), "Mr Joe Bloggs");
        assert_eq!(patient.born(), "15-Feb-2010");
        assert_eq!(patient.gender(), "Male");
        assert_eq!(patient.family_name(), Some("Bloggs"));
    }

    #[test]
    fn nhs_number_is_grouped() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        let ids = fixture_patient(&index).identifiers();
        assert_eq!(ids.len(), 1);
        let nhs = ids[0];
        assert_eq!(nhs.value(), "993254128");
        assert_eq!(nhs.nhs_number(), "9932 541 28");
        assert!(nhs.unverified());
        assert!(!nhs.verified());
        assert!(!nhs.local());
    }

    #[test]
    fn local_identifier_has_no_nhs_number() {
        let identifier = Identifier {
            system: Some("https://trust.example/mrn".into()),
            value: Some("MRN-1".into()),
            ..Default::default()
        };
        let view = PatientIdentifierView::new(&identifier);
        assert!(view.local());
        assert_eq!(view.nhs_number(), "Unknown");
        assert!(!view.verified() && !view.unverified());
    }

    #[test]
    fn verification_extension_marks_nhs_number() {
        let identifier = Identifier {
            value: Some("9434765919".into()),
            extension: vec![Extension {
                url: NHS_NUMBER_VERIFICATION_EXTENSION.into(),
                value_codeable_concept: Some(CodeableConcept {
                    coding: vec![Coding::new("01", "Number present and verified")],
                    text: None,
                }),
                value_string: None,
            }],
            ..Default::default()
        };
        let view = PatientIdentifierView::new(&identifier);
        assert!(view.verified());
        assert_eq!(view.nhs_number(), "9434 765 919");
    }

    #[test]
    fn short_values_are_not_grouped() {
        assert_eq!(group_nhs_number("123456"), "123456");
        assert_eq!(group_nhs_number("1234567"), "1234 567");
    }

    #[test]
    fn general_practitioners_resolve_by_type() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        let gps = fixture_patient(&index).general_practitioner();
        assert_eq!(gps.len(), 1);
        assert!(gps[0].is_organization());
        assert_eq!(gps[0].name(), "Medway Medical Practice");
    }

    #[test]
    fn organization_and_practitioner_with_same_id_stay_apart() {
        let mut bundle = fixture_bundle();
        for entry in &mut bundle.entry {
            if let Some(Resource::Patient(patient)) = &mut entry.resource {
                patient.general_practitioner = vec![
                    Reference::to("Organization/1"),
                    Reference::to("Practitioner/1"),
                    Reference::to("Practitioner/404"),
                ];
            }
        }
        let index = ResourceIndex::new(&bundle);
        let gps = fixture_patient(&index).general_practitioner();

        assert_eq!(gps.len(), 2);
        assert!(gps[0].is_organization() && !gps[0].is_practitioner());
        assert_eq!(gps[0].name(), "Medway Medical Practice");
        assert!(gps[1].is_practitioner() && !gps[1].is_organization());
        assert_eq!(gps[1].name(), "Dr Frankenstein");
    }

    #[test]
    fn missing_patient_degrades() {
        let bundle = Bundle::new();
        let index = ResourceIndex::new(&bundle);
        let patient = PatientView::new(None, &index);
        assert_eq!(patient.name(), "Unknown");
        assert_eq!(patient.born(), "Unknown");
        assert_eq!(patient.gender(), "Unknown");
        assert!(patient.identifiers().is_empty());
        assert!(patient.general_practitioner().is_empty());
    }
}
