//! FHIR STU3 resource wire models.
//!
//! Each struct models only the fields the encounter report reads. Resources are decoded
//! from JSON through [`Resource`], which dispatches on `resourceType` and keeps any type it
//! does not recognise as [`Resource::Other`] rather than failing the whole bundle.

use crate::datatypes::{
    Address, Annotation, CodeableConcept, ContactPoint, Dosage, HumanName, Identifier, Narrative,
    Period, Reference,
};
use crate::FhirError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Resource type tags
// ============================================================================

/// Closed set of resource types the report understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Encounter,
    Patient,
    Organization,
    Practitioner,
    Consent,
    Observation,
    EpisodeOfCare,
    Location,
    Composition,
    RelatedPerson,
    MedicationStatement,
    AllergyIntolerance,
    DiagnosticReport,
    ClinicalImpression,
    Appointment,
    List,
}

impl ResourceType {
    /// Wire name as it appears in `resourceType`.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Encounter => "Encounter",
            ResourceType::Patient => "Patient",
            ResourceType::Organization => "Organization",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Consent => "Consent",
            ResourceType::Observation => "Observation",
            ResourceType::EpisodeOfCare => "EpisodeOfCare",
            ResourceType::Location => "Location",
            ResourceType::Composition => "Composition",
            ResourceType::RelatedPerson => "RelatedPerson",
            ResourceType::MedicationStatement => "MedicationStatement",
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::ClinicalImpression => "ClinicalImpression",
            ResourceType::Appointment => "Appointment",
            ResourceType::List => "List",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "Encounter" => Some(ResourceType::Encounter),
            "Patient" => Some(ResourceType::Patient),
            "Organization" => Some(ResourceType::Organization),
            "Practitioner" => Some(ResourceType::Practitioner),
            "Consent" => Some(ResourceType::Consent),
            "Observation" => Some(ResourceType::Observation),
            "EpisodeOfCare" => Some(ResourceType::EpisodeOfCare),
            "Location" => Some(ResourceType::Location),
            "Composition" => Some(ResourceType::Composition),
            "RelatedPerson" => Some(ResourceType::RelatedPerson),
            "MedicationStatement" => Some(ResourceType::MedicationStatement),
            "AllergyIntolerance" => Some(ResourceType::AllergyIntolerance),
            "DiagnosticReport" => Some(ResourceType::DiagnosticReport),
            "ClinicalImpression" => Some(ResourceType::ClinicalImpression),
            "Appointment" => Some(ResourceType::Appointment),
            "List" => Some(ResourceType::List),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Resource wire models
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncounterLocation {
    #[serde(default)]
    pub location: Reference,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub episode_of_care: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_provider: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location: Vec<EncounterLocation>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub general_practitioner: Vec<Reference>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action: Vec<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeOfCare {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub care_manager: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managing_organization: Option<Reference>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Narrative>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub section: Vec<CompositionSection>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPerson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<CodeableConcept>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage: Vec<Dosage>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AllergyIntolerance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalImpression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    #[serde(default)]
    pub item: Reference,
}

/// The `List` resource (named to avoid clashing with the prelude).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<ListEntry>,
}

/// A resource whose type this system does not model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtherResource {
    pub resource_type: String,
    pub id: Option<String>,
}

// ============================================================================
// Resource enum
// ============================================================================

/// Any resource found in a bundle entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    Encounter(Encounter),
    Patient(Patient),
    Organization(Organization),
    Practitioner(Practitioner),
    Consent(Consent),
    Observation(Observation),
    EpisodeOfCare(EpisodeOfCare),
    Location(Location),
    Composition(Composition),
    RelatedPerson(RelatedPerson),
    MedicationStatement(MedicationStatement),
    AllergyIntolerance(AllergyIntolerance),
    DiagnosticReport(DiagnosticReport),
    ClinicalImpression(ClinicalImpression),
    Appointment(Appointment),
    List(ListResource),
    Other(OtherResource),
}

impl Resource {
    /// Type tag, or `None` for [`Resource::Other`].
    pub fn resource_type(&self) -> Option<ResourceType> {
        Some(match self {
            Resource::Encounter(_) => ResourceType::Encounter,
            Resource::Patient(_) => ResourceType::Patient,
            Resource::Organization(_) => ResourceType::Organization,
            Resource::Practitioner(_) => ResourceType::Practitioner,
            Resource::Consent(_) => ResourceType::Consent,
            Resource::Observation(_) => ResourceType::Observation,
            Resource::EpisodeOfCare(_) => ResourceType::EpisodeOfCare,
            Resource::Location(_) => ResourceType::Location,
            Resource::Composition(_) => ResourceType::Composition,
            Resource::RelatedPerson(_) => ResourceType::RelatedPerson,
            Resource::MedicationStatement(_) => ResourceType::MedicationStatement,
            Resource::AllergyIntolerance(_) => ResourceType::AllergyIntolerance,
            Resource::DiagnosticReport(_) => ResourceType::DiagnosticReport,
            Resource::ClinicalImpression(_) => ResourceType::ClinicalImpression,
            Resource::Appointment(_) => ResourceType::Appointment,
            Resource::List(_) => ResourceType::List,
            Resource::Other(_) => return None,
        })
    }

    /// Wire type name, including names of unmodelled types.
    pub fn type_name(&self) -> &str {
        match self {
            Resource::Other(other) => &other.resource_type,
            known => known.resource_type().map(ResourceType::as_str).unwrap_or_default(),
        }
    }

    /// The resource's own id, as written in the bundle.
    pub fn id(&self) -> Option<&str> {
        match self {
            Resource::Encounter(r) => r.id.as_deref(),
            Resource::Patient(r) => r.id.as_deref(),
            Resource::Organization(r) => r.id.as_deref(),
            Resource::Practitioner(r) => r.id.as_deref(),
            Resource::Consent(r) => r.id.as_deref(),
            Resource::Observation(r) => r.id.as_deref(),
            Resource::EpisodeOfCare(r) => r.id.as_deref(),
            Resource::Location(r) => r.id.as_deref(),
            Resource::Composition(r) => r.id.as_deref(),
            Resource::RelatedPerson(r) => r.id.as_deref(),
            Resource::MedicationStatement(r) => r.id.as_deref(),
            Resource::AllergyIntolerance(r) => r.id.as_deref(),
            Resource::DiagnosticReport(r) => r.id.as_deref(),
            Resource::ClinicalImpression(r) => r.id.as_deref(),
            Resource::Appointment(r) => r.id.as_deref(),
            Resource::List(r) => r.id.as_deref(),
            Resource::Other(r) => r.id.as_deref(),
        }
    }

    /// Decode a resource from a JSON value, dispatching on `resourceType`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if `resourceType` is missing or a known resource type does not
    /// match its wire schema.
    pub fn from_value(value: serde_json::Value) -> Result<Self, FhirError> {
        let type_name = value
            .get("resourceType")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| FhirError::InvalidInput("resource is missing resourceType".into()))?
            .to_string();

        let Some(resource_type) = ResourceType::from_wire(&type_name) else {
            let id = value
                .get("id")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            return Ok(Resource::Other(OtherResource {
                resource_type: type_name,
                id,
            }));
        };

        Ok(match resource_type {
            ResourceType::Encounter => Resource::Encounter(decode(value, &type_name)?),
            ResourceType::Patient => Resource::Patient(decode(value, &type_name)?),
            ResourceType::Organization => Resource::Organization(decode(value, &type_name)?),
            ResourceType::Practitioner => Resource::Practitioner(decode(value, &type_name)?),
            ResourceType::Consent => Resource::Consent(decode(value, &type_name)?),
            ResourceType::Observation => Resource::Observation(decode(value, &type_name)?),
            ResourceType::EpisodeOfCare => Resource::EpisodeOfCare(decode(value, &type_name)?),
            ResourceType::Location => Resource::Location(decode(value, &type_name)?),
            ResourceType::Composition => Resource::Composition(decode(value, &type_name)?),
            ResourceType::RelatedPerson => Resource::RelatedPerson(decode(value, &type_name)?),
            ResourceType::MedicationStatement => {
                Resource::MedicationStatement(decode(value, &type_name)?)
            }
            ResourceType::AllergyIntolerance => {
                Resource::AllergyIntolerance(decode(value, &type_name)?)
            }
            ResourceType::DiagnosticReport => {
                Resource::DiagnosticReport(decode(value, &type_name)?)
            }
            ResourceType::ClinicalImpression => {
                Resource::ClinicalImpression(decode(value, &type_name)?)
            }
            ResourceType::Appointment => Resource::Appointment(decode(value, &type_name)?),
            ResourceType::List => Resource::List(decode(value, &type_name)?),
        })
    }

    /// Encode the resource back to JSON, including `resourceType`.
    ///
    /// Unmodelled resources are written with their type and id only.
    pub fn to_value(&self) -> Result<serde_json::Value, FhirError> {
        let mut value = match self {
            Resource::Encounter(r) => serde_json::to_value(r),
            Resource::Patient(r) => serde_json::to_value(r),
            Resource::Organization(r) => serde_json::to_value(r),
            Resource::Practitioner(r) => serde_json::to_value(r),
            Resource::Consent(r) => serde_json::to_value(r),
            Resource::Observation(r) => serde_json::to_value(r),
            Resource::EpisodeOfCare(r) => serde_json::to_value(r),
            Resource::Location(r) => serde_json::to_value(r),
            Resource::Composition(r) => serde_json::to_value(r),
            Resource::RelatedPerson(r) => serde_json::to_value(r),
            Resource::MedicationStatement(r) => serde_json::to_value(r),
            Resource::AllergyIntolerance(r) => serde_json::to_value(r),
            Resource::DiagnosticReport(r) => serde_json::to_value(r),
            Resource::ClinicalImpression(r) => serde_json::to_value(r),
            Resource::Appointment(r) => serde_json::to_value(r),
            Resource::List(r) => serde_json::to_value(r),
            Resource::Other(r) => Ok(serde_json::json!({ "id": r.id })),
        }?;

        if let Some(object) = value.as_object_mut() {
            object.insert(
                "resourceType".to_string(),
                serde_json::Value::String(self.type_name().to_string()),
            );
        }
        Ok(value)
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Resource::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

fn decode<T>(value: serde_json::Value, type_name: &str) -> Result<T, FhirError>
where
    T: serde::de::DeserializeOwned,
{
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        FhirError::Translation(format!("{type_name} schema mismatch at {path}: {source}"))
    })
}
