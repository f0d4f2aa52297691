//! The encounter report projection.
//!
//! [`EncounterReport`] is a read-only view over one bundle. Every accessor degrades to
//! "Unknown" (or an empty list) when data is missing, with two exceptions that fail the
//! report instead:
//! - the informant group ([`EncounterReport::informant`],
//!   [`EncounterReport::informant_home_address`], [`EncounterReport::contact_points`]),
//!   which requires a RelatedPerson with a name, relationship, address and two telecoms;
//! - composition sections, whose positions are a contract with the report layout.

use crate::constants::{REPORT_TITLE, UNKNOWN};
use crate::dates::{display_date_time, format_date, format_date_time};
use crate::index::ResourceIndex;
use crate::patient::PatientView;
use crate::sections::{self, ReportSection, SectionLayout, SectionView};
use crate::{ReportError, ReportResult};
use fhir::{
    AllergyIntolerance, Appointment, Bundle, ClinicalImpression, Composition, Consent,
    DiagnosticReport, Encounter, EpisodeOfCare, Identifier, Location, MedicationStatement,
    Observation, Organization, Patient, Period, Practitioner, RelatedPerson,
};
use serde::Serialize;

/// Home address of the informant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InformantHomeAddress {
    pub first_line: String,
    pub second_line: String,
    pub city: String,
    pub postcode: String,
}

/// Phone numbers of the informant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPoints {
    pub mob_phone: String,
    pub home_phone: String,
}

/// Description and comment of the first Appointment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppointmentView {
    pub description: String,
    pub comment: String,
}

#[derive(Clone, Debug)]
pub struct EncounterReport<'a> {
    index: ResourceIndex<'a>,
    layout: SectionLayout,
}

impl<'a> EncounterReport<'a> {
    pub fn new(bundle: &'a Bundle) -> Self {
        Self::with_layout(bundle, SectionLayout::default())
    }

    pub fn with_layout(bundle: &'a Bundle, layout: SectionLayout) -> Self {
        Self {
            index: ResourceIndex::new(bundle),
            layout,
        }
    }

    pub fn index(&self) -> &ResourceIndex<'a> {
        &self.index
    }

    pub fn title(&self) -> &'static str {
        REPORT_TITLE
    }

    /// Bundle `meta.lastUpdated` as a display date-time.
    pub fn created(&self) -> String {
        format_date_time(self.index.bundle().last_updated())
    }

    // ------------------------------------------------------------------------
    // Encounter
    // ------------------------------------------------------------------------

    pub fn encounter(&self) -> Option<&'a Encounter> {
        self.index.find_first::<Encounter>()
    }

    pub fn encounter_id(&self) -> String {
        self.encounter()
            .and_then(|e| e.id.clone())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn encounter_identifiers(&self) -> &'a [Identifier] {
        self.encounter()
            .map(|e| e.identifier.as_slice())
            .unwrap_or_default()
    }

    pub fn encounter_status(&self) -> String {
        let display = match self.encounter().and_then(|e| e.status.as_deref()) {
            Some("planned") => "Planned",
            Some("arrived") => "Arrived",
            Some("triaged") => "Triaged",
            Some("in-progress") => "In Progress",
            Some("onleave") => "On Leave",
            Some("finished") => "Finished",
            Some("cancelled") => "Cancelled",
            Some("entered-in-error") => "Entered in Error",
            _ => UNKNOWN,
        };
        display.to_string()
    }

    /// `start to end` in the display timezone. Either side may be missing.
    pub fn encounter_period(&self) -> String {
        let Some(period) = self.encounter().and_then(|e| e.period.as_ref()) else {
            return UNKNOWN.to_string();
        };
        or_unknown(Some(format_period(period)))
    }

    /// Locations that resolve in the bundle. Unresolvable references are dropped.
    pub fn encounter_location(&self) -> Vec<&'a Location> {
        let Some(encounter) = self.encounter() else {
            return Vec::new();
        };
        encounter
            .location
            .iter()
            .filter_map(|entry| {
                let found = self.index.find_by_reference::<Location>(&entry.location);
                if found.is_none() {
                    tracing::warn!(
                        reference = entry.location.reference.as_deref(),
                        "encounter location not in bundle; dropped"
                    );
                }
                found
            })
            .collect()
    }

    pub fn patient(&self) -> PatientView<'_> {
        let patient = self
            .encounter()
            .and_then(|e| e.subject.as_ref())
            .and_then(|subject| self.index.find_by_reference::<Patient>(subject));
        PatientView::new(patient, &self.index)
    }

    pub fn service_provider(&self) -> Option<&'a Organization> {
        self.encounter()
            .and_then(|e| e.service_provider.as_ref())
            .and_then(|r| self.index.find_by_reference::<Organization>(r))
    }

    /// Name of the organization responsible for the encounter.
    pub fn owner(&self) -> String {
        self.service_provider()
            .and_then(|org| org.name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn episodes_of_care(&self) -> impl Iterator<Item = &'a EpisodeOfCare> + '_ {
        self.encounter()
            .into_iter()
            .flat_map(|e| e.episode_of_care.iter())
            .filter_map(move |r| self.index.find_by_reference::<EpisodeOfCare>(r))
    }

    /// Care manager of the encounter's episode of care.
    pub fn responsible_party(&self) -> String {
        self.episodes_of_care()
            .filter_map(|eoc| eoc.care_manager.as_ref())
            .filter_map(|r| self.index.find_by_reference::<Practitioner>(r))
            .find_map(|p| p.name.first().map(|n| n.as_single_string()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Managing organization of the encounter's episode of care.
    pub fn responsible_party_org(&self) -> String {
        self.episodes_of_care()
            .filter_map(|eoc| eoc.managing_organization.as_ref())
            .filter_map(|r| self.index.find_by_reference::<Organization>(r))
            .find_map(|org| org.name.clone())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    // ------------------------------------------------------------------------
    // Consent
    // ------------------------------------------------------------------------

    fn consent(&self) -> Option<&'a Consent> {
        self.index.find_first::<Consent>()
    }

    /// Display text of every consent action, comma separated.
    pub fn consent_status(&self) -> String {
        match self.consent().filter(|c| !c.action.is_empty()) {
            Some(consent) => consent
                .action
                .iter()
                .map(|action| {
                    action
                        .first_coding()
                        .and_then(|c| c.display.as_deref())
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>()
                .join(","),
            None => UNKNOWN.to_string(),
        }
    }

    pub fn consent_obtained(&self) -> String {
        format_date(
            self.consent()
                .and_then(|c| c.period.as_ref())
                .and_then(|p| p.start.as_deref()),
        )
    }

    pub fn consent_expires(&self) -> String {
        format_date(
            self.consent()
                .and_then(|c| c.period.as_ref())
                .and_then(|p| p.end.as_deref()),
        )
    }

    // ------------------------------------------------------------------------
    // Informant
    // ------------------------------------------------------------------------

    fn related_person(&self) -> ReportResult<&'a RelatedPerson> {
        self.index
            .find_first::<RelatedPerson>()
            .ok_or(ReportError::MissingInformant("related person"))
    }

    /// `"{given} {family}, {relationship}"` of the first RelatedPerson.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::MissingInformant`] if there is no RelatedPerson, or it has no
    /// name or relationship coding.
    pub fn informant(&self) -> ReportResult<String> {
        let person = self.related_person()?;
        let name = person
            .name
            .first()
            .ok_or(ReportError::MissingInformant("name"))?;
        let relationship = person
            .relationship
            .as_ref()
            .and_then(|r| r.first_coding())
            .and_then(|c| c.display.as_deref())
            .ok_or(ReportError::MissingInformant("relationship"))?;

        Ok(format!(
            "{} {}, {}",
            name.given.join(" "),
            name.family.as_deref().unwrap_or_default(),
            relationship
        ))
    }

    /// # Errors
    ///
    /// Returns [`ReportError::MissingInformant`] if there is no RelatedPerson or it has no
    /// address.
    pub fn informant_home_address(&self) -> ReportResult<InformantHomeAddress> {
        let address = self
            .related_person()?
            .address
            .first()
            .ok_or(ReportError::MissingInformant("home address"))?;
        let line = |i: usize| address.line.get(i).cloned().unwrap_or_default();

        Ok(InformantHomeAddress {
            first_line: line(0),
            second_line: line(1),
            city: address.city.clone().unwrap_or_default(),
            postcode: address.postal_code.clone().unwrap_or_default(),
        })
    }

    /// Mobile then home number, in telecom order.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::MissingInformant`] if there is no RelatedPerson or it has
    /// fewer than two telecoms with values.
    pub fn contact_points(&self) -> ReportResult<ContactPoints> {
        let telecom = &self.related_person()?.telecom;
        let value = |i: usize, field: &'static str| {
            telecom
                .get(i)
                .and_then(|t| t.value.clone())
                .ok_or(ReportError::MissingInformant(field))
        };

        Ok(ContactPoints {
            mob_phone: value(0, "mobile phone")?,
            home_phone: value(1, "home phone")?,
        })
    }

    // ------------------------------------------------------------------------
    // Clinical free text
    // ------------------------------------------------------------------------

    pub fn medication_statement(&self) -> String {
        or_unknown(
            self.index
                .find_first::<MedicationStatement>()
                .and_then(|m| m.dosage.first())
                .and_then(|d| d.text.clone()),
        )
    }

    pub fn allergy_intolerance(&self) -> String {
        or_unknown(
            self.index
                .find_first::<AllergyIntolerance>()
                .and_then(|a| a.note.first())
                .and_then(|n| n.text.clone()),
        )
    }

    pub fn triage_report(&self) -> String {
        or_unknown(
            self.index
                .find_first::<DiagnosticReport>()
                .and_then(|d| d.conclusion.clone()),
        )
    }

    pub fn clinical_impression(&self) -> String {
        or_unknown(
            self.index
                .find_first::<ClinicalImpression>()
                .and_then(|c| c.description.clone()),
        )
    }

    pub fn observation(&self) -> String {
        or_unknown(
            self.index
                .find_first::<Observation>()
                .and_then(|o| o.comment.clone()),
        )
    }

    pub fn appointment(&self) -> AppointmentView {
        let appointment = self.index.find_first::<Appointment>();
        AppointmentView {
            description: or_unknown(appointment.and_then(|a| a.description.clone())),
            comment: or_unknown(appointment.and_then(|a| a.comment.clone())),
        }
    }

    // ------------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------------

    /// # Errors
    ///
    /// See [`sections::section`].
    pub fn section(&self, which: ReportSection) -> ReportResult<SectionView> {
        sections::section(self.index.find_first::<Composition>(), which, self.layout)
    }

    pub fn sections(&self) -> ReportResult<Vec<SectionView>> {
        sections::all_sections(self.index.find_first::<Composition>(), self.layout)
    }

    /// Evaluate every field, failing on the first contract violation.
    pub fn summary(&self) -> ReportResult<ReportSummary> {
        let patient = self.patient();
        Ok(ReportSummary {
            title: self.title().to_string(),
            created: self.created(),
            encounter_id: self.encounter_id(),
            encounter_status: self.encounter_status(),
            encounter_period: self.encounter_period(),
            encounter_location: self
                .encounter_location()
                .iter()
                .map(|l| l.name.clone().unwrap_or_else(|| UNKNOWN.to_string()))
                .collect(),
            patient_name: patient.name(),
            patient_born: patient.born(),
            patient_gender: patient.gender(),
            patient_nhs_numbers: patient
                .identifiers()
                .iter()
                .filter(|id| id.is_nhs_number())
                .map(|id| id.nhs_number())
                .collect(),
            general_practitioner: patient
                .general_practitioner()
                .iter()
                .map(|gp| gp.name())
                .collect(),
            owner: self.owner(),
            responsible_party: self.responsible_party(),
            responsible_party_org: self.responsible_party_org(),
            consent_status: self.consent_status(),
            consent_obtained: self.consent_obtained(),
            consent_expires: self.consent_expires(),
            informant: self.informant()?,
            informant_home_address: self.informant_home_address()?,
            contact_points: self.contact_points()?,
            medication_statement: self.medication_statement(),
            allergy_intolerance: self.allergy_intolerance(),
            triage_report: self.triage_report(),
            clinical_impression: self.clinical_impression(),
            observation: self.observation(),
            appointment: self.appointment(),
            sections: self
                .sections()?
                .into_iter()
                .map(|s| SectionSummary {
                    title: s.title,
                    text: s.text,
                })
                .collect(),
        })
    }
}

/// `"<start> to <end>"`, keeping only the ends that parse. Empty if neither does.
fn format_period(period: &Period) -> String {
    let start = period.start.as_deref().and_then(display_date_time);
    let end = period.end.as_deref().and_then(display_date_time);
    let mut out = start.unwrap_or_default();
    if let Some(end) = end {
        out.push_str(" to ");
        out.push_str(&end);
    }
    out
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Flattened, serialisable copy of every report field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub title: String,
    pub created: String,
    pub encounter_id: String,
    pub encounter_status: String,
    pub encounter_period: String,
    pub encounter_location: Vec<String>,
    pub patient_name: String,
    pub patient_born: String,
    pub patient_gender: String,
    pub patient_nhs_numbers: Vec<String>,
    pub general_practitioner: Vec<String>,
    pub owner: String,
    pub responsible_party: String,
    pub responsible_party_org: String,
    pub consent_status: String,
    pub consent_obtained: String,
    pub consent_expires: String,
    pub informant: String,
    pub informant_home_address: InformantHomeAddress,
    pub contact_points: ContactPoints,
    pub medication_statement: String,
    pub allergy_intolerance: String,
    pub triage_report: String,
    pub clinical_impression: String,
    pub observation: String,
    pub appointment: AppointmentView,
    pub sections: Vec<SectionSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub title: String,
    pub text: String,
}
