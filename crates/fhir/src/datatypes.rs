//! FHIR STU3 general-purpose datatypes.
//!
//! These are the building blocks shared by every resource wire model: names, addresses,
//! contact points, codings, periods and narratives.
//!
//! Notes:
//! - Bundles arrive from remote clinical-data servers, so unknown keys are ignored rather
//!   than rejected.
//! - Dates and date-times are kept as their original strings; parsing happens at the point
//!   of display (see [`FhirDateTime`]).

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// URL of the CareConnect NHS number verification status extension.
pub const NHS_NUMBER_VERIFICATION_EXTENSION: &str =
    "https://fhir.hl7.org.uk/STU3/StructureDefinition/Extension-CareConnect-NHSNumberVerificationStatus-1";

/// Identifier system for NHS numbers.
pub const NHS_NUMBER_SYSTEM: &str = "https://fhir.nhs.uk/Id/nhs-number";

/// A reference from one resource to another.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    /// Build a reference from a literal reference string such as `Organization/1`.
    pub fn to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            display: None,
        }
    }
}

/// A generic extension, carrying only the value shapes this system reads.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
}

/// A business identifier (NHS number, local hospital number, ...).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

impl Identifier {
    /// Returns the extension with the given URL, if present.
    pub fn extension(&self, url: &str) -> Option<&Extension> {
        self.extension.iter().find(|ext| ext.url == url)
    }
}

/// A coded value drawn from a terminology.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(code: &str, display: &str) -> Self {
        Self {
            system: None,
            code: Some(code.to_string()),
            display: Some(display.to_string()),
        }
    }
}

/// A concept carried as one or more codings plus optional text.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// First coding, mirroring the common "first repetition" access pattern.
    pub fn first_coding(&self) -> Option<&Coding> {
        self.coding.first()
    }
}

/// A human name.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffix: Vec<String>,
}

impl HumanName {
    /// Render the name as a single display string.
    ///
    /// Uses `text` when present, otherwise joins prefixes, given names, family name and
    /// suffixes with single spaces, skipping blank parts.
    pub fn as_single_string(&self) -> String {
        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return text.to_string();
        }

        self.prefix
            .iter()
            .chain(self.given.iter())
            .chain(self.family.iter())
            .chain(self.suffix.iter())
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A postal address.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// Whether the address carries no displayable content at all.
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.line.is_empty()
            && self.city.is_none()
            && self.district.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }

    /// Non-empty address parts in display order.
    pub fn parts(&self) -> Vec<&str> {
        if let Some(text) = self.text.as_deref() {
            return vec![text];
        }
        self.line
            .iter()
            .map(String::as_str)
            .chain(self.city.as_deref())
            .chain(self.district.as_deref())
            .chain(self.state.as_deref())
            .chain(self.postal_code.as_deref())
            .chain(self.country.as_deref())
            .filter(|part| !part.trim().is_empty())
            .collect()
    }
}

/// A telephone number, email address or other contact channel.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContactPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
}

/// A time range with optional ends.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Human-readable XHTML summary of a resource or section.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default)]
    pub div: String,
}

/// A free-text note.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Medication dosage instructions.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dosage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Resource or bundle metadata.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// A parsed FHIR `date` or `dateTime` value.
///
/// FHIR permits partial dates (`2010`, `2010-02`) and date-times with an offset. Partial
/// dates are widened to the first day of the missing period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FhirDateTime {
    /// A calendar date without a time component.
    Date(NaiveDate),
    /// An instant with a time component.
    DateTime(DateTime<Utc>),
}

impl FhirDateTime {
    /// Parse a FHIR `date` or `dateTime` string. Returns `None` for malformed input.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.contains('T') {
            let parsed = DateTime::parse_from_rfc3339(value)
                .ok()
                .or_else(|| parse_minute_precision(value))?;
            return Some(Self::DateTime(parsed.with_timezone(&Utc)));
        }

        let parts: Vec<&str> = value.split('-').collect();
        let date = match parts.as_slice() {
            [y] => NaiveDate::from_ymd_opt(y.parse().ok()?, 1, 1),
            [y, m] => NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, 1),
            [y, m, d] => NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?),
            _ => None,
        }?;
        Some(Self::Date(date))
    }

    /// The calendar date of this value (UTC date for instants).
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(dt) => dt.date_naive(),
        }
    }

    /// The instant of this value (midnight UTC for plain dates).
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            Self::Date(date) => Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)),
            Self::DateTime(dt) => *dt,
        }
    }
}

/// `YYYY-MM-DDThh:mm` with a `Z` or `±hh:mm` offset, as some servers send it.
fn parse_minute_precision(value: &str) -> Option<DateTime<FixedOffset>> {
    let normalised = match value.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => value.to_string(),
    };
    DateTime::parse_from_str(&normalised, "%Y-%m-%dT%H:%M%:z").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_string_prefers_text() {
        let name = HumanName {
            text: Some("Joe Bloggs".into()),
            family: Some("Other".into()),
            ..Default::default()
        };
        assert_eq!(name.as_single_string(), "Joe Bloggs");
    }

    #[test]
    fn single_string_joins_parts_in_order() {
        let name = HumanName {
            prefix: vec!["Mr".into()],
            given: vec!["Joe".into(), "Adam".into()],
            family: Some("Bloggs".into()),
            ..Default::default()
        };
        assert_eq!(name.as_single_string(), "Mr Joe Adam Bloggs");

        let practitioner = HumanName {
            prefix: vec!["Dr".into()],
            family: Some("Frankenstein".into()),
            ..Default::default()
        };
        assert_eq!(practitioner.as_single_string(), "Dr Frankenstein");
    }

    #[test]
    fn parses_partial_and_full_dates() {
        assert_eq!(
            FhirDateTime::parse("2010-02-15").map(|d| d.date()),
            NaiveDate::from_ymd_opt(2010, 2, 15)
        );
        assert_eq!(
            FhirDateTime::parse("2010").map(|d| d.date()),
            NaiveDate::from_ymd_opt(2010, 1, 1)
        );
        let instant = FhirDateTime::parse("2020-04-01T14:00:00+01:00").expect("valid dateTime");
        assert_eq!(instant.instant().to_rfc3339(), "2020-04-01T13:00:00+00:00");
        assert!(FhirDateTime::parse("not a date").is_none());
        assert!(FhirDateTime::parse("2020-13-01").is_none());
    }

    #[test]
    fn accepts_minute_precision_date_times() {
        let zulu = FhirDateTime::parse("2020-04-01T13:00Z").expect("minute precision");
        assert_eq!(zulu.instant().to_rfc3339(), "2020-04-01T13:00:00+00:00");

        let offset = FhirDateTime::parse("2020-04-01T14:32+01:00").expect("minute precision");
        assert_eq!(offset.instant().to_rfc3339(), "2020-04-01T13:32:00+00:00");

        assert!(FhirDateTime::parse("2020-04-01T13:00").is_none());
        assert!(FhirDateTime::parse("2020-04-01T25:00Z").is_none());
    }

    #[test]
    fn address_parts_skip_blanks() {
        let address = Address {
            line: vec!["123 Some Street".into(), " ".into()],
            city: Some("A Town".into()),
            postal_code: Some("ME5 7TY".into()),
            ..Default::default()
        };
        assert_eq!(address.parts(), vec!["123 Some Street", "A Town", "ME5 7TY"]);
        assert!(Address::default().is_empty());
    }
}
