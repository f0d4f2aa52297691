//! Free-text report sections taken from the Composition.
//!
//! The report expects the Composition to carry its sections in a fixed order, with the
//! report content starting at index 2. [`SectionLayout::Positional`] reads them by index
//! and [`SectionLayout::ByTitle`] matches on the expected title instead. Either way a
//! missing section is a contract violation and fails the report; an empty narrative is
//! data absence and yields "Unknown".

use crate::constants::UNKNOWN;
use crate::narrative;
use crate::{ReportError, ReportResult};
use fhir::{Composition, CompositionSection};

/// The sections rendered on an encounter report, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportSection {
    PermissionToView,
    PrimaryReasonForCall,
    ConsultationSummary,
    PathwaysDisposition,
    PathwaysAssessment,
    CareAdvice,
    WorseningAdvice,
    SpecialNotes,
    ConsultationDetails,
}

impl ReportSection {
    pub const ALL: [ReportSection; 9] = [
        ReportSection::PermissionToView,
        ReportSection::PrimaryReasonForCall,
        ReportSection::ConsultationSummary,
        ReportSection::PathwaysDisposition,
        ReportSection::PathwaysAssessment,
        ReportSection::CareAdvice,
        ReportSection::WorseningAdvice,
        ReportSection::SpecialNotes,
        ReportSection::ConsultationDetails,
    ];

    /// Position of this section within the Composition.
    pub fn index(self) -> usize {
        match self {
            ReportSection::PermissionToView => 2,
            ReportSection::PrimaryReasonForCall => 3,
            ReportSection::ConsultationSummary => 4,
            ReportSection::PathwaysDisposition => 5,
            ReportSection::PathwaysAssessment => 6,
            ReportSection::CareAdvice => 7,
            ReportSection::WorseningAdvice => 8,
            ReportSection::SpecialNotes => 9,
            ReportSection::ConsultationDetails => 10,
        }
    }

    /// Title this section is expected to carry.
    pub fn title(self) -> &'static str {
        match self {
            ReportSection::PermissionToView => "Permission to View",
            ReportSection::PrimaryReasonForCall => "Primary Reason for Call",
            ReportSection::ConsultationSummary => "Consultation Summary",
            ReportSection::PathwaysDisposition => "Pathways Disposition",
            ReportSection::PathwaysAssessment => "Pathways Assessment",
            ReportSection::CareAdvice => "Care Advice",
            ReportSection::WorseningAdvice => "Worsening Advice",
            ReportSection::SpecialNotes => "Special Notes",
            ReportSection::ConsultationDetails => "Consultation Details",
        }
    }
}

/// How report sections are located in the Composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SectionLayout {
    #[default]
    Positional,
    ByTitle,
}

/// A section ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionView {
    pub title: String,
    /// Plain text of the first `<div>`.
    pub text: String,
    /// Normalised XHTML, empty when the section has no narrative.
    pub markup: String,
}

impl SectionView {
    fn from_section(section: &CompositionSection) -> ReportResult<Self> {
        let title = section
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let Some(div) = section
            .text
            .as_ref()
            .map(|n| n.div.as_str())
            .filter(|d| !d.trim().is_empty())
        else {
            return Ok(Self {
                title,
                text: UNKNOWN.to_string(),
                markup: String::new(),
            });
        };

        let text = narrative::first_div_text(div)?
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());
        Ok(Self {
            title,
            text,
            markup: narrative::normalize(div)?,
        })
    }
}

/// Locate one report section.
///
/// # Errors
///
/// - [`ReportError::MissingComposition`] if the bundle has no Composition.
/// - [`ReportError::MissingSection`] if a positional index is out of range.
/// - [`ReportError::SectionNotFound`] if no section carries the expected title.
/// - [`ReportError::Narrative`] if the section markup is malformed.
pub fn section(
    composition: Option<&Composition>,
    which: ReportSection,
    layout: SectionLayout,
) -> ReportResult<SectionView> {
    let composition = composition.ok_or(ReportError::MissingComposition)?;
    let found = match layout {
        SectionLayout::Positional => composition.section.get(which.index()).ok_or(
            ReportError::MissingSection {
                index: which.index(),
                available: composition.section.len(),
            },
        )?,
        SectionLayout::ByTitle => composition
            .section
            .iter()
            .find(|s| {
                s.title
                    .as_deref()
                    .is_some_and(|t| t.trim().eq_ignore_ascii_case(which.title()))
            })
            .ok_or_else(|| ReportError::SectionNotFound {
                title: which.title().to_string(),
            })?,
    };
    SectionView::from_section(found)
}

/// All report sections in report order.
pub fn all_sections(
    composition: Option<&Composition>,
    layout: SectionLayout,
) -> ReportResult<Vec<SectionView>> {
    ReportSection::ALL
        .iter()
        .map(|which| section(composition, *which, layout))
        .collect()
}
