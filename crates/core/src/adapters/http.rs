//! Bundle acquisition.

use crate::pipeline::BundleSource;
use crate::{ReportError, ReportResult};
use fhir::Bundle;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::path::PathBuf;
use std::time::Duration;

const FHIR_JSON: &str = "application/fhir+json";

/// Fetches an encounter bundle from a FHIR server.
///
/// The query asks for everything the encounter references and everything referencing it,
/// recursively, so the report can be built from one response.
#[derive(Clone, Debug)]
pub struct HttpBundleSource {
    client: Client,
    base_url: Option<String>,
}

impl HttpBundleSource {
    /// Build a source. The client must be created off the async runtime.
    pub fn new(base_url: Option<String>, timeout: Duration) -> ReportResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Query URL for an encounter reference.
    ///
    /// Absolute references carry their own base; relative references and bare ids use the
    /// configured one.
    pub fn query_url(&self, encounter: &str) -> ReportResult<String> {
        let parsed = fhir::parse_reference(encounter)?;
        if let Some(version) = &parsed.version {
            tracing::debug!(
                encounter,
                version = %version,
                "fetching current encounter, not the pinned version"
            );
        }
        let base = match (&parsed.base_url, &self.base_url) {
            (Some(base), _) => base.clone(),
            (None, Some(base)) => base.clone(),
            (None, None) => {
                return Err(ReportError::Config(format!(
                    "relative reference {encounter} needs EMS_FHIR_BASE_URL"
                )))
            }
        };
        Ok(format!(
            "{}/Encounter?_id={}&_include:recurse=*&_revinclude:recurse=*",
            base.trim_end_matches('/'),
            parsed.id
        ))
    }
}

impl BundleSource for HttpBundleSource {
    fn fetch(&self, encounter: &str) -> ReportResult<Bundle> {
        let url = self.query_url(encounter)?;
        tracing::debug!(url = %url, "fetching encounter bundle");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, FHIR_JSON)
            .send()
            .map_err(|e| ReportError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Fetch(format!("{url} returned {status}")));
        }

        let body = response
            .text()
            .map_err(|e| ReportError::Fetch(e.to_string()))?;
        let bundle = Bundle::from_json(&body)?;
        tracing::debug!(entries = bundle.entry.len(), "bundle fetched");
        Ok(bundle)
    }
}

/// Reads a bundle from a JSON file, whatever encounter is asked for.
#[derive(Clone, Debug)]
pub struct FileBundleSource {
    path: PathBuf,
}

impl FileBundleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BundleSource for FileBundleSource {
    fn fetch(&self, encounter: &str) -> ReportResult<Bundle> {
        tracing::debug!(encounter, path = %self.path.display(), "reading bundle file");
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            ReportError::Fetch(format!("failed to read {}: {e}", self.path.display()))
        })?;
        Ok(Bundle::from_json(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_bundle;

    fn source(base: Option<&str>) -> HttpBundleSource {
        HttpBundleSource::new(base.map(str::to_string), Duration::from_secs(1)).expect("client")
    }

    #[test]
    fn absolute_reference_keeps_its_base() {
        let url = source(Some("http://configured"))
            .query_url("http://fhir.example/fhir/Encounter/42")
            .expect("url");
        assert_eq!(
            url,
            "http://fhir.example/fhir/Encounter?_id=42&_include:recurse=*&_revinclude:recurse=*"
        );
    }

    #[test]
    fn relative_reference_uses_configured_base() {
        let url = source(Some("http://configured/fhir/"))
            .query_url("Encounter/7")
            .expect("url");
        assert!(url.starts_with("http://configured/fhir/Encounter?_id=7&"));

        let err = source(None).query_url("7").expect_err("no base");
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[test]
    fn versioned_reference_queries_current_encounter() {
        let url = source(None)
            .query_url("http://fhir.example/fhir/Encounter/42/_history/3")
            .expect("url");
        assert!(url.starts_with("http://fhir.example/fhir/Encounter?_id=42&"));
    }

    #[test]
    fn file_source_reads_bundle() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, fixture_bundle().to_json().expect("json")).expect("write");

        let bundle = FileBundleSource::new(&path).fetch("Encounter/1").expect("bundle");
        assert_eq!(bundle.entry.len(), fixture_bundle().entry.len());

        let err = FileBundleSource::new(dir.path().join("missing.json"))
            .fetch("Encounter/1")
            .expect_err("missing file");
        assert!(matches!(err, ReportError::Fetch(_)));
    }
}
