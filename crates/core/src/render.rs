//! Built-in HTML rendering of an encounter report.
//!
//! The layout is fixed. All projected values are HTML-escaped; section bodies are embedded
//! as their normalised XHTML. The patient banner table is laid out so that
//! [`crate::naming::name_from_banner`] recovers the attachment name from the output.

use crate::constants::{PATIENT_BANNER_ID, UNKNOWN};
use crate::pipeline::ReportRenderer;
use crate::report::EncounterReport;
use crate::ReportResult;
use quick_xml::escape::escape;

const STYLE: &str = "body{font-family:Arial,sans-serif;font-size:11pt;margin:24px}\
h1{font-size:18pt}h2{font-size:13pt;border-bottom:1px solid #999}\
table{border-collapse:collapse;width:100%;margin-bottom:12px}\
td,th{border:1px solid #ccc;padding:4px;text-align:left;vertical-align:top}\
.section-table-header{background:#eee}#patientBanner td{border:none;font-size:12pt}";

/// Renders [`EncounterReport`] to a self-contained HTML document.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlReportRenderer;

impl HtmlReportRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ReportRenderer for HtmlReportRenderer {
    fn render(&self, report: &EncounterReport<'_>) -> ReportResult<String> {
        let mut html = String::with_capacity(16 * 1024);
        html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"/>");
        html.push_str(&format!("<title>{}</title>", escape(report.title())));
        html.push_str(&format!("<style>{STYLE}</style></head><body>\n"));

        html.push_str(&format!(
            "<h1>{}</h1>\n<p>Created {}</p>\n",
            escape(report.title()),
            escape(&report.created())
        ));

        patient_banner(&mut html, report);
        encounter_details(&mut html, report);
        informant_details(&mut html, report)?;
        clinical_details(&mut html, report);

        for section in report.sections()? {
            html.push_str(&format!("<h2>{}</h2>\n", escape(&section.title)));
            if section.markup.is_empty() {
                html.push_str(&format!("<p>{}</p>\n", escape(&section.text)));
            } else {
                html.push_str(&section.markup);
                html.push('\n');
            }
        }

        html.push_str("</body></html>\n");
        Ok(html)
    }
}

fn row(html: &mut String, label: &str, value: &str) {
    html.push_str(&format!(
        "<tr><th>{}</th><td>{}</td></tr>\n",
        escape(label),
        escape(value)
    ));
}

fn patient_banner(html: &mut String, report: &EncounterReport<'_>) {
    let patient = report.patient();
    let name = patient.patient().and_then(|p| p.name.first());
    let family = name
        .and_then(|n| n.family.as_deref())
        .map(str::to_uppercase)
        .unwrap_or_else(|| UNKNOWN.to_uppercase());
    let given = name.map(|n| n.given.join(" ")).unwrap_or_default();
    let prefix = name.map(|n| n.prefix.join(" ")).unwrap_or_default();

    let nhs = patient
        .identifiers()
        .into_iter()
        .find(|id| id.is_nhs_number());
    let (status, number) = match nhs {
        Some(id) if id.verified() => ("(verified)", id.nhs_number()),
        Some(id) if id.unverified() => ("(unverified)", id.nhs_number()),
        Some(id) => ("(unchecked)", id.nhs_number()),
        None => ("(none)", UNKNOWN.to_string()),
    };

    html.push_str(&format!(
        "<div id=\"{PATIENT_BANNER_ID}\"><table><tr>\
         <td><b>Name</b> {}, {}{}</td>\
         <td><b>Born</b> {}</td>\
         <td><b>Gender</b> {}</td>\
         <td><b>NHS Number</b> {} {}</td>\
         </tr></table></div>\n",
        escape(&family),
        escape(&given),
        if prefix.is_empty() {
            String::new()
        } else {
            format!(" ({})", escape(&prefix))
        },
        escape(&patient.born()),
        escape(&patient.gender()),
        status,
        escape(&number),
    ));

    html.push_str("<h2>Patient</h2>\n<table>\n");
    row(html, "Name", &patient.name());
    for address in patient.address() {
        row(html, "Address", &address.parts().join(", "));
    }
    for telecom in patient.telecom() {
        row(html, "Telecom", telecom.value.as_deref().unwrap_or(UNKNOWN));
    }
    for gp in patient.general_practitioner() {
        let label = if gp.is_organization() {
            "GP Practice"
        } else {
            "GP"
        };
        let address = gp.address().map(|a| a.parts().join(", ")).unwrap_or_default();
        if address.is_empty() {
            row(html, label, &gp.name());
        } else {
            row(html, label, &format!("{} ({address})", gp.name()));
        }
    }
    html.push_str("</table>\n");
}

fn encounter_details(html: &mut String, report: &EncounterReport<'_>) {
    html.push_str("<h2>Encounter</h2>\n<table>\n");
    row(html, "Encounter", &report.encounter_id());
    for identifier in report.encounter_identifiers() {
        row(html, "Identifier", identifier.value.as_deref().unwrap_or(UNKNOWN));
    }
    row(html, "Status", &report.encounter_status());
    row(html, "Period", &report.encounter_period());
    for location in report.encounter_location() {
        row(html, "Location", location.name.as_deref().unwrap_or(UNKNOWN));
    }
    row(html, "Owner", &report.owner());
    row(html, "Responsible party", &report.responsible_party());
    row(html, "Responsible organization", &report.responsible_party_org());
    row(html, "Consent", &report.consent_status());
    row(html, "Consent obtained", &report.consent_obtained());
    row(html, "Consent expires", &report.consent_expires());
    let appointment = report.appointment();
    row(html, "Appointment", &appointment.description);
    row(html, "Appointment comment", &appointment.comment);
    html.push_str("</table>\n");
}

fn informant_details(html: &mut String, report: &EncounterReport<'_>) -> ReportResult<()> {
    let informant = report.informant()?;
    let address = report.informant_home_address()?;
    let phones = report.contact_points()?;

    html.push_str("<h2>Informant</h2>\n<table>\n");
    row(html, "Informant", &informant);
    row(html, "Address line 1", &address.first_line);
    row(html, "Address line 2", &address.second_line);
    row(html, "City", &address.city);
    row(html, "Postcode", &address.postcode);
    row(html, "Mobile", &phones.mob_phone);
    row(html, "Home", &phones.home_phone);
    html.push_str("</table>\n");
    Ok(())
}

fn clinical_details(html: &mut String, report: &EncounterReport<'_>) {
    html.push_str("<h2>Clinical</h2>\n<table>\n");
    row(html, "Observation", &report.observation());
    row(html, "Medication", &report.medication_statement());
    row(html, "Allergies", &report.allergy_intolerance());
    row(html, "Triage", &report.triage_report());
    row(html, "Clinical impression", &report.clinical_impression());
    html.push_str("</table>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{build_name, name_from_banner};
    use crate::test_support::fixture_bundle;
    use crate::ReportError;
    use fhir::Bundle;

    #[test]
    fn renders_fixture() {
        let bundle = fixture_bundle();
        let report = EncounterReport::new(&bundle);
        let html = HtmlReportRenderer::new().render(&report).expect("renders");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Encounter Report</h1>"));
        assert!(html.contains("Medway Medical Practice"));
        assert!(html.contains("Helga Bloggs, Spouse"));
        assert!(html.contains("<h2>Primary Reason for Call</h2>"));
        assert!(html.contains("Patient feels dizzy."));
        assert!(html.contains("id=\"patientBanner\""));
    }

    #[test]
    fn banner_round_trips_to_attachment_name() {
        let bundle = fixture_bundle();
        let report = EncounterReport::new(&bundle);
        let html = HtmlReportRenderer::new().render(&report).expect("renders");

        let from_patient = build_name(&report.patient()).expect("patient name");
        assert_eq!(name_from_banner(&html).expect("banner name"), from_patient);
    }

    #[test]
    fn values_are_escaped() {
        let mut html = String::new();
        row(&mut html, "Note", "<script>alert('x')</script> & more");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn missing_informant_fails_render() {
        let bundle = Bundle::new();
        let report = EncounterReport::new(&bundle);
        let err = HtmlReportRenderer::new()
            .render(&report)
            .expect_err("no informant");
        assert!(matches!(err, ReportError::MissingInformant(_)));
    }
}
