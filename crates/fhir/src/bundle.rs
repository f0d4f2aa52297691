//! FHIR bundle wire model.
//!
//! A bundle is the unit exchanged with the clinical-data server: an ordered list of entries
//! plus bundle-level metadata. Entry order is preserved so lookups are deterministic.

use crate::datatypes::Meta;
use crate::resources::Resource;
use crate::FhirError;
use serde::{Deserialize, Serialize};

/// One bundle entry.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}

/// A FHIR bundle.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(rename = "resourceType", default = "bundle_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

fn bundle_resource_type() -> String {
    "Bundle".to_string()
}

impl Default for Bundle {
    fn default() -> Self {
        Self {
            resource_type: bundle_resource_type(),
            id: None,
            meta: None,
            bundle_type: None,
            entry: Vec::new(),
        }
    }
}

impl Bundle {
    /// An empty searchset bundle.
    pub fn new() -> Self {
        Self {
            bundle_type: Some("searchset".into()),
            ..Default::default()
        }
    }

    /// Parse a bundle from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface a best-effort path (e.g. `entry[3].resource`)
    /// to the failing field when the JSON does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the JSON is malformed or does not match the bundle schema,
    /// - `resourceType` is not "Bundle".
    pub fn from_json(json_text: &str) -> Result<Self, FhirError> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let bundle = match serde_path_to_error::deserialize::<_, Bundle>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };

        if bundle.resource_type != "Bundle" {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Bundle', got '{}'",
                bundle.resource_type
            )));
        }

        Ok(bundle)
    }

    /// Render the bundle as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, FhirError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }

    /// Append a resource entry, using `Type/id` as the full URL.
    pub fn push(&mut self, resource: Resource) {
        let full_url = resource
            .id()
            .map(|id| format!("{}/{id}", resource.type_name()));
        self.entry.push(BundleEntry {
            full_url,
            resource: Some(resource),
        });
    }

    /// Resources in entry order, skipping entries without one.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().filter_map(|e| e.resource.as_ref())
    }

    /// Bundle-level `meta.lastUpdated`, if present.
    pub fn last_updated(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.last_updated.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Organization, ResourceType};

    #[test]
    fn parses_bundle_preserving_order() {
        let input = r#"{
  "resourceType": "Bundle",
  "type": "searchset",
  "meta": { "lastUpdated": "2020-09-01T15:32:00Z" },
  "entry": [
    { "fullUrl": "Encounter/1", "resource": { "resourceType": "Encounter", "id": "1" } },
    { "fullUrl": "Patient/1", "resource": { "resourceType": "Patient", "id": "1" } },
    { "fullUrl": "Flag/1", "resource": { "resourceType": "Flag", "id": "1" } },
    { "fullUrl": "Organization/1" }
  ]
}"#;

        let bundle = Bundle::from_json(input).expect("parse bundle");
        let types: Vec<&str> = bundle.resources().map(Resource::type_name).collect();
        assert_eq!(types, vec!["Encounter", "Patient", "Flag"]);
        assert_eq!(bundle.last_updated(), Some("2020-09-01T15:32:00Z"));
    }

    #[test]
    fn rejects_non_bundle() {
        let err = Bundle::from_json(r#"{ "resourceType": "Patient" }"#)
            .expect_err("should reject non-bundle");
        match err {
            FhirError::InvalidInput(msg) => assert!(msg.contains("Patient")),
            other => panic!("expected InvalidInput error, got {other:?}"),
        }
    }

    #[test]
    fn reports_bad_entry() {
        let err = Bundle::from_json(
            r#"{ "resourceType": "Bundle", "entry": [ { "resource": { "id": "1" } } ] }"#,
        )
        .expect_err("should reject entry without resourceType");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("resourceType"), "{msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }
    }

    #[test]
    fn push_and_round_trip() {
        let mut bundle = Bundle::new();
        bundle.push(Resource::Organization(Organization {
            id: Some("1".into()),
            name: Some("Medway Medical Practice".into()),
            ..Default::default()
        }));

        assert_eq!(bundle.entry[0].full_url.as_deref(), Some("Organization/1"));

        let json = bundle.to_json().expect("render bundle");
        let reparsed = Bundle::from_json(&json).expect("reparse bundle");
        assert_eq!(bundle, reparsed);
        assert_eq!(
            reparsed.resources().next().and_then(Resource::resource_type),
            Some(ResourceType::Organization)
        );
    }
}
