//! Attachment filenames.
//!
//! Both forms produce `{nhsNumber}_{FAMILY}_{yyyyMMdd}.pdf`:
//! - [`build_name`] from the resolved patient when dispatching a report;
//! - [`name_from_banner`] from the patient banner of an already rendered HTML report.

use crate::constants::PATIENT_BANNER_ID;
use crate::dates::compact_date;
use crate::patient::PatientView;
use crate::{ReportError, ReportResult};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

const ATTACHMENT_EXTENSION: &str = "pdf";
const UNKNOWN_FAMILY: &str = "UNKNOWN";
const BANNER_DATE_FORMAT: &str = "%d-%b-%Y";

/// Build the attachment filename for a patient.
///
/// # Errors
///
/// Returns [`ReportError::AttachmentName`] if the patient has no identifier value or no
/// parseable birth date. There is no fallback: callers dispatch only resolved patients.
pub fn build_name(patient: &PatientView<'_>) -> ReportResult<String> {
    let identifier = patient
        .patient()
        .and_then(|p| p.identifier.first())
        .and_then(|id| id.value.as_deref())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ReportError::AttachmentName("patient has no identifier".into()))?;

    let birth_date = patient
        .birth_date()
        .ok_or_else(|| ReportError::AttachmentName("patient has no birth date".into()))?;
    let born = compact_date(birth_date).ok_or_else(|| {
        ReportError::AttachmentName(format!("unreadable birth date '{birth_date}'"))
    })?;

    let family = patient
        .family_name()
        .filter(|f| !f.trim().is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| UNKNOWN_FAMILY.to_string());

    Ok(format!(
        "{}_{family}_{born}.{ATTACHMENT_EXTENSION}",
        identifier.replace(' ', "")
    ))
}

// ============================================================================
// Banner parsing
// ============================================================================

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table\b.*?</table>").expect("static pattern"));
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("static pattern"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("static pattern"));

/// Text content of the cells of the first table inside the patient banner.
fn banner_cells(html: &str) -> ReportResult<Vec<String>> {
    let marker = format!("id=\"{PATIENT_BANNER_ID}\"");
    let start = html
        .find(&marker)
        .ok_or_else(|| ReportError::AttachmentName("no patient banner in document".into()))?;

    let table = TABLE_RE
        .find(&html[start..])
        .ok_or_else(|| ReportError::AttachmentName("patient banner has no table".into()))?;

    Ok(CELL_RE
        .captures_iter(table.as_str())
        .map(|caps| {
            let inner = caps.get(1).map_or("", |m| m.as_str());
            let text = decode_entities(&TAG_RE.replace_all(inner, " "));
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect())
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn word(cell: &str, index: usize) -> Option<&str> {
    cell.split(' ').nth(index)
}

/// Derive the attachment filename from a rendered report's patient banner.
///
/// The banner table is read positionally: cell 0 holds `"<label> <FAMILY>, ..."`, cell 1
/// holds `"<label> dd-MMM-yyyy"` and cell 3 holds `"<label> <label> <label> NNN NNN NNNN"`.
///
/// # Errors
///
/// Returns [`ReportError::AttachmentName`] if the banner, a cell or a word is missing, or
/// the birth date does not parse.
pub fn name_from_banner(html: &str) -> ReportResult<String> {
    let cells = banner_cells(html)?;
    let missing = |what: &str| ReportError::AttachmentName(format!("patient banner has no {what}"));

    let name_cell = cells.first().ok_or_else(|| missing("name cell"))?;
    let family = word(name_cell, 1)
        .map(|w| w.trim_end_matches(','))
        .filter(|w| !w.is_empty())
        .ok_or_else(|| missing("family name"))?;

    let dob_cell = cells.get(1).ok_or_else(|| missing("birth date cell"))?;
    let dob_text = word(dob_cell, 1).ok_or_else(|| missing("birth date"))?;
    let dob = NaiveDate::parse_from_str(dob_text, BANNER_DATE_FORMAT).map_err(|e| {
        ReportError::AttachmentName(format!("unreadable banner birth date '{dob_text}': {e}"))
    })?;

    let nhs_cell = cells.get(3).ok_or_else(|| missing("NHS number cell"))?;
    let nhs_number = (3..6)
        .map(|i| word(nhs_cell, i))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| missing("NHS number"))?
        .concat();

    Ok(format!(
        "{nhs_number}_{family}_{}.{ATTACHMENT_EXTENSION}",
        dob.format("%Y%m%d")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ResourceIndex;
    use crate::test_support::fixture_bundle;
    use fhir::{Bundle, HumanName, Identifier, Patient, Resource};

    fn patient_bundle(patient: Patient) -> Bundle {
        let mut bundle = Bundle::new();
        bundle.push(Resource::Patient(patient));
        bundle
    }

    #[test]
    fn builds_name_from_patient() {
        let bundle = fixture_bundle();
        let index = ResourceIndex::new(&bundle);
        let patient = PatientView::new(index.find_first::<Patient>(), &index);
        assert_eq!(
            build_name(&patient).expect("resolvable"),
            "993254128_BLOGGS_20100215.pdf"
        );
    }

    #[test]
    fn missing_identifier_fails() {
        let bundle = patient_bundle(Patient {
            birth_date: Some("2010-02-15".into()),
            ..Default::default()
        });
        let index = ResourceIndex::new(&bundle);
        let patient = PatientView::new(index.find_first::<Patient>(), &index);
        let err = build_name(&patient).expect_err("no identifier");
        assert!(matches!(err, ReportError::AttachmentName(_)));
    }

    #[test]
    fn missing_birth_date_fails() {
        let bundle = patient_bundle(Patient {
            identifier: vec![Identifier {
                value: Some("993254128".into()),
                ..Default::default()
            }],
            name: vec![HumanName {
                family: Some("Bloggs".into()),
                ..Default::default()
            }],
            ..Default::default()
        });
        let index = ResourceIndex::new(&bundle);
        let patient = PatientView::new(index.find_first::<Patient>(), &index);
        match build_name(&patient).expect_err("no birth date") {
            ReportError::AttachmentName(msg) => assert!(msg.contains("birth date")),
            other => panic!("expected AttachmentName, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_patient_fails() {
        let bundle = Bundle::new();
        let index = ResourceIndex::new(&bundle);
        let patient = PatientView::new(None, &index);
        assert!(build_name(&patient).is_err());
    }

    #[test]
    fn missing_family_is_placeholder() {
        let bundle = patient_bundle(Patient {
            identifier: vec![Identifier {
                value: Some("1234".into()),
                ..Default::default()
            }],
            birth_date: Some("1990-07-04".into()),
            ..Default::default()
        });
        let index = ResourceIndex::new(&bundle);
        let patient = PatientView::new(index.find_first::<Patient>(), &index);
        assert_eq!(build_name(&patient).expect("ok"), "1234_UNKNOWN_19900704.pdf");
    }

    const BANNER: &str = r#"<html><body>
        <div id="patientBanner" class="banner">
          <table>
            <tr>
              <td><b>Name</b> BLOGGS, Joe (Mr)</td>
              <td>Born 15-Feb-2010</td>
              <td>Gender Male</td>
              <td>NHS Number (unverified) 993 254 128</td>
            </tr>
          </table>
        </div>
        <table><tr><td>Other Table</td></tr></table>
    </body></html>"#;

    #[test]
    fn banner_name() {
        assert_eq!(
            name_from_banner(BANNER).expect("banner"),
            "993254128_BLOGGS_20100215.pdf"
        );
    }

    #[test]
    fn banner_without_table_fails() {
        let err = name_from_banner(r#"<div id="patientBanner">no table</div>"#)
            .expect_err("no table");
        assert!(matches!(err, ReportError::AttachmentName(_)));

        let err = name_from_banner("<p>nothing</p>").expect_err("no banner");
        assert!(matches!(err, ReportError::AttachmentName(_)));
    }

    #[test]
    fn banner_with_bad_date_fails() {
        let html = BANNER.replace("15-Feb-2010", "2010-02-15");
        match name_from_banner(&html).expect_err("bad date") {
            ReportError::AttachmentName(msg) => assert!(msg.contains("birth date")),
            other => panic!("expected AttachmentName, got {other:?}"),
        }
    }
}
