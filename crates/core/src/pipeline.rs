//! Report dispatch.
//!
//! [`DispatchPipeline`] runs one report end to end:
//! acquire bundle, build the projection, render, convert, name the attachment, transmit.
//! Each stage is timed. The first failing stage aborts the rest and nothing is sent.

use crate::config::EmailSettings;
use crate::constants::{DISPATCH_FAILED, DISPATCH_OK};
use crate::email::OutgoingEmail;
use crate::naming;
use crate::report::EncounterReport;
use crate::sections::SectionLayout;
use crate::stopwatch::StagedStopwatch;
use crate::{ReportError, ReportResult};
use fhir::Bundle;

// ============================================================================
// Collaborators
// ============================================================================

/// Fetches the bundle for an encounter, with everything it references and everything that
/// references it.
pub trait BundleSource {
    fn fetch(&self, encounter: &str) -> ReportResult<Bundle>;
}

/// Renders a report to a document.
pub trait ReportRenderer {
    fn render(&self, report: &EncounterReport<'_>) -> ReportResult<String>;
}

/// Converts a rendered document to the attachment format.
pub trait DocumentConverter {
    fn convert(&self, document: &str) -> ReportResult<Vec<u8>>;
}

/// Sends a finished email.
pub trait Transmitter {
    fn send(&self, email: &OutgoingEmail) -> ReportResult<()>;
}

impl<T: Transmitter + ?Sized> Transmitter for Box<T> {
    fn send(&self, email: &OutgoingEmail) -> ReportResult<()> {
        (**self).send(email)
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of one pipeline run.
#[derive(Debug)]
pub enum DispatchOutcome {
    Sent { filename: String },
    Failed { stage: &'static str, error: ReportError },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }

    /// User-visible status: "200 OK" or "500 Server Error".
    pub fn status_line(&self) -> &'static str {
        if self.is_success() {
            DISPATCH_OK
        } else {
            DISPATCH_FAILED
        }
    }
}

/// Run `f` as a named stage. The stage is timed whether or not it succeeds; on failure the
/// stage name travels with the error.
pub(crate) fn stage<T>(
    stopwatch: &mut StagedStopwatch,
    name: &'static str,
    f: impl FnOnce() -> ReportResult<T>,
) -> Result<T, (&'static str, ReportError)> {
    let result = f();
    stopwatch.finish_stage(name);
    result.map_err(|error| (name, error))
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct DispatchPipeline {
    settings: EmailSettings,
    layout: SectionLayout,
    source: Box<dyn BundleSource + Send + Sync>,
    renderer: Box<dyn ReportRenderer + Send + Sync>,
    converter: Box<dyn DocumentConverter + Send + Sync>,
    transmitter: Box<dyn Transmitter + Send + Sync>,
}

impl DispatchPipeline {
    pub fn new(
        settings: EmailSettings,
        source: impl BundleSource + Send + Sync + 'static,
        renderer: impl ReportRenderer + Send + Sync + 'static,
        converter: impl DocumentConverter + Send + Sync + 'static,
        transmitter: impl Transmitter + Send + Sync + 'static,
    ) -> Self {
        Self {
            settings,
            layout: SectionLayout::default(),
            source: Box::new(source),
            renderer: Box::new(renderer),
            converter: Box::new(converter),
            transmitter: Box::new(transmitter),
        }
    }

    pub fn with_layout(mut self, layout: SectionLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Run the pipeline for one encounter reference.
    pub fn dispatch(&self, encounter: &str) -> DispatchOutcome {
        tracing::info!(encounter, "dispatching encounter report");
        let mut stopwatch = StagedStopwatch::start();
        let result = self.run(encounter, &mut stopwatch);
        let total_ms = stopwatch.total().as_millis() as u64;

        match result {
            Ok(filename) => {
                tracing::info!(encounter, filename = %filename, total_ms, "encounter report sent");
                DispatchOutcome::Sent { filename }
            }
            Err((stage, error)) => {
                tracing::error!(
                    encounter,
                    stage,
                    stages = ?stopwatch.stage_names(),
                    total_ms,
                    error = %error,
                    "encounter report aborted"
                );
                DispatchOutcome::Failed { stage, error }
            }
        }
    }

    fn run(
        &self,
        encounter: &str,
        stopwatch: &mut StagedStopwatch,
    ) -> Result<String, (&'static str, ReportError)> {
        let bundle = stage(stopwatch, "retrieving bundle", || {
            self.source.fetch(encounter)
        })?;

        let report = stage(stopwatch, "building model", || {
            Ok(EncounterReport::with_layout(&bundle, self.layout))
        })?;

        let html = stage(stopwatch, "html transformation", || {
            self.renderer.render(&report)
        })?;

        let pdf = stage(stopwatch, "pdf transformation", || {
            self.converter.convert(&html)
        })?;

        let filename = stage(stopwatch, "naming attachment", || {
            let patient = report.patient();
            if !patient.is_resolved() {
                return Err(ReportError::AttachmentName(
                    "encounter subject did not resolve to a Patient".into(),
                ));
            }
            naming::build_name(&patient)
        })?;

        stage(stopwatch, "sending email", || {
            let email = OutgoingEmail::new(&self.settings, pdf, filename.clone());
            self.transmitter.send(&email)
        })?;

        Ok(filename)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::{Arc, Mutex};

    pub struct StaticSource(pub ReportResult<Bundle>);

    impl BundleSource for StaticSource {
        fn fetch(&self, _encounter: &str) -> ReportResult<Bundle> {
            match &self.0 {
                Ok(bundle) => Ok(bundle.clone()),
                Err(e) => Err(ReportError::Fetch(e.to_string())),
            }
        }
    }

    pub struct EchoConverter;

    impl DocumentConverter for EchoConverter {
        fn convert(&self, document: &str) -> ReportResult<Vec<u8>> {
            Ok(document.as_bytes().to_vec())
        }
    }

    pub struct FailingConverter;

    impl DocumentConverter for FailingConverter {
        fn convert(&self, _document: &str) -> ReportResult<Vec<u8>> {
            Err(ReportError::Convert("converter exited with status 1".into()))
        }
    }

    #[derive(Clone, Default)]
    pub struct RecordingTransmitter {
        pub sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    }

    impl Transmitter for RecordingTransmitter {
        fn send(&self, email: &OutgoingEmail) -> ReportResult<()> {
            self.sent
                .lock()
                .map_err(|_| ReportError::Send("recorder poisoned".into()))?
                .push(email.clone());
            Ok(())
        }
    }
}
