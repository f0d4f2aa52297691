//! Shared fixtures for unit tests.

use crate::config::EmailSettings;
use ems_types::{EmailAddress, NonEmptyText};
use fhir::{Bundle, NHS_NUMBER_SYSTEM, NHS_NUMBER_VERIFICATION_EXTENSION};
use serde_json::{json, Value};

/// Rendered patient banner for a report about Joe Bloggs.
pub const BANNER_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<h1>Encounter Report</h1>
<div id="patientBanner"><table><tr>
<td><b>Name</b> BLOGGS, Joe (Mr)</td>
<td><b>Born</b> 15-Feb-2010</td>
<td><b>Gender</b> Male</td>
<td><b>NHS Number</b> (unverified) 9932 541 28</td>
</tr></table></div>
</body></html>"#;

pub fn email_settings() -> EmailSettings {
    EmailSettings::new(
        EmailAddress::new("reports@ems.example").expect("valid sender"),
        vec![EmailAddress::new("gp@medway.example").expect("valid recipient")],
        NonEmptyText::new("Encounter report").expect("subject"),
        NonEmptyText::new("Please find the encounter report attached.").expect("body"),
    )
    .expect("valid settings")
}

fn narrative(text: &str) -> Value {
    json!({
        "status": "generated",
        "div": format!("<div xmlns=\"http://www.w3.org/1999/xhtml\">{text}</div>")
    })
}

fn sections() -> Vec<Value> {
    let mut sections = vec![json!({ "title": "" }), json!({ "title": "" })];
    sections.push(json!({
        "title": "Permission to View",
        "text": narrative(
            "<table><tbody xmlns=\"http://www.w3.org/1999/xhtml\">\
             <tr><th>Consent</th><th>Given</th></tr>\
             <tr><td>Permission to view</td><td>Yes</td></tr></tbody></table>"
        )
    }));
    for _ in 3..12 {
        sections.push(json!({
            "title": "Primary Reason for Call",
            "text": narrative("Patient feels dizzy.")
        }));
    }
    sections
}

/// A complete encounter bundle: patient Joe Bloggs seen on 1 April 2020.
pub fn fixture_bundle() -> Bundle {
    let bundle = json!({
        "resourceType": "Bundle",
        "id": "encounter-1",
        "type": "searchset",
        "meta": { "lastUpdated": "2020-04-02T08:30:00Z" },
        "entry": [
            { "fullUrl": "http://fhir.example/Organization/1", "resource": {
                "resourceType": "Organization",
                "id": "1",
                "name": "Medway Medical Practice",
                "address": [{ "line": ["1 High Street"], "city": "Chatham", "postalCode": "ME4 4AA" }],
                "telecom": [{ "system": "phone", "value": "01634 000000" }]
            }},
            { "fullUrl": "http://fhir.example/Patient/1", "resource": {
                "resourceType": "Patient",
                "id": "1",
                "identifier": [{
                    "system": NHS_NUMBER_SYSTEM,
                    "value": "993254128",
                    "extension": [{
                        "url": NHS_NUMBER_VERIFICATION_EXTENSION,
                        "valueCodeableConcept": {
                            "coding": [{ "code": "02", "display": "Number present but not traced" }]
                        }
                    }]
                }],
                "name": [{ "prefix": ["Mr"], "given": ["Joe"], "family": "Bloggs" }],
                "gender": "male",
                "birthDate": "2010-02-15",
                "address": [{ "line": ["43 Summers Avenue"], "city": "Medway", "postalCode": "ME5 7TY" }],
                "telecom": [{ "system": "phone", "value": "01783678321", "use": "home" }],
                "generalPractitioner": [{ "reference": "Organization/1" }]
            }},
            { "fullUrl": "http://fhir.example/Practitioner/1", "resource": {
                "resourceType": "Practitioner",
                "id": "1",
                "name": [{ "prefix": ["Dr"], "family": "Frankenstein" }]
            }},
            { "resource": {
                "resourceType": "EpisodeOfCare",
                "id": "1",
                "careManager": { "reference": "Practitioner/1" },
                "managingOrganization": { "reference": "Organization/1" }
            }},
            { "resource": {
                "resourceType": "Appointment",
                "id": "1",
                "description": "Ambulance dispatch",
                "comment": "Caller advised to stay with patient"
            }},
            { "resource": {
                "resourceType": "Location",
                "id": "1",
                "name": "Ambulance Station"
            }},
            { "resource": {
                "resourceType": "Encounter",
                "id": "1",
                "identifier": [{ "value": "ENC-0001" }],
                "status": "finished",
                "subject": { "reference": "Patient/1" },
                "episodeOfCare": [{ "reference": "EpisodeOfCare/1" }],
                "serviceProvider": { "reference": "http://fhir.example/Organization/1" },
                "period": { "start": "2020-04-01T13:00:00Z", "end": "2020-04-01T14:32:00Z" },
                "location": [
                    { "location": { "reference": "Location/1" } },
                    { "location": { "reference": "Location/404" } }
                ]
            }},
            { "resource": {
                "resourceType": "Consent",
                "id": "1",
                "status": "active",
                "action": [{ "coding": [{ "code": "access", "display": "Permission to view" }] }],
                "period": { "start": "2020-01-01", "end": "2020-12-31" }
            }},
            { "resource": {
                "resourceType": "Observation",
                "id": "1",
                "status": "final",
                "comment": "Patient feels dizzy."
            }},
            { "resource": {
                "resourceType": "Composition",
                "id": "1",
                "title": "Encounter Report",
                "encounter": { "reference": "Encounter/1" },
                "section": sections()
            }},
            { "resource": {
                "resourceType": "RelatedPerson",
                "id": "1",
                "patient": { "reference": "Patient/1" },
                "relationship": { "coding": [{ "code": "sp", "display": "Spouse" }] },
                "name": [{ "given": ["Helga"], "family": "Bloggs" }],
                "gender": "female",
                "address": [{
                    "line": ["43 Summers Avenue", "Somerset Street"],
                    "city": "Medway",
                    "postalCode": "ME5 7TY"
                }],
                "telecom": [
                    { "system": "phone", "value": "07886554123", "use": "mobile" },
                    { "system": "phone", "value": "01783678321", "use": "home" }
                ]
            }},
            { "resource": {
                "resourceType": "MedicationStatement",
                "id": "1",
                "subject": { "reference": "Patient/1" },
                "dosage": [{ "text": "Medications" }]
            }},
            { "resource": {
                "resourceType": "AllergyIntolerance",
                "id": "1",
                "patient": { "reference": "Patient/1" },
                "note": [{ "text": "No known allergies or adverse reaction." }]
            }},
            { "resource": {
                "resourceType": "DiagnosticReport",
                "id": "1",
                "subject": { "reference": "Patient/1" },
                "conclusion": "Ambulance response category 3"
            }},
            { "resource": {
                "resourceType": "ClinicalImpression",
                "id": "1",
                "subject": { "reference": "Patient/1" },
                "description": "Dizziness without loss of consciousness"
            }},
            { "resource": {
                "resourceType": "List",
                "id": "1",
                "title": "Encounter resources",
                "entry": [{ "item": { "reference": "Encounter/1" } }]
            }},
            { "resource": {
                "resourceType": "Flag",
                "id": "1"
            }}
        ]
    });

    Bundle::from_json(&bundle.to_string()).expect("fixture bundle decodes")
}
