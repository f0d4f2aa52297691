//! Reference string parsing.
//!
//! References inside a bundle may be written in several forms:
//! - Relative: `Patient/123`
//! - Versioned: `Patient/123/_history/1`
//! - Absolute URL: `http://example.org/fhir/Patient/123`
//! - Contained: `#contained-id`
//! - URN: `urn:uuid:...`
//!
//! Matching within a bundle only ever compares the id part, so absolute and relative forms
//! of the same reference resolve to the same resource.

use crate::FhirError;
use std::fmt;

const HISTORY_SEGMENT: &str = "_history";

/// A parsed reference string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParsedReference {
    /// Base URL of an absolute reference (`http://example.org/fhir`), if any.
    pub base_url: Option<String>,
    /// Resource type segment, if the reference names one.
    pub resource_type: Option<String>,
    /// The id part.
    pub id: String,
    /// Version from a `_history` suffix.
    pub version: Option<String>,
}

impl ParsedReference {
    /// Returns the reference as a relative string (`Type/id`), or just the id when no type
    /// is known.
    pub fn to_relative(&self) -> String {
        match &self.resource_type {
            Some(resource_type) => format!("{resource_type}/{}", self.id),
            None => self.id.clone(),
        }
    }
}

impl fmt::Display for ParsedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base_url {
            Some(base) => write!(f, "{base}/{}", self.to_relative()),
            None => write!(f, "{}", self.to_relative()),
        }
    }
}

/// Parse a reference string into its parts.
///
/// # Errors
///
/// Returns [`FhirError::InvalidReference`] for empty, contained (`#id`) or URN references,
/// none of which carry a resolvable id part.
pub fn parse_reference(reference: &str) -> Result<ParsedReference, FhirError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(FhirError::InvalidReference("empty reference".into()));
    }
    if reference.starts_with('#') {
        return Err(FhirError::InvalidReference(format!(
            "contained reference {reference} cannot be resolved by id"
        )));
    }
    if reference.starts_with("urn:") {
        return Err(FhirError::InvalidReference(format!(
            "URN reference {reference} cannot be resolved by id"
        )));
    }

    let (scheme_prefix, path) = match reference.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, reference),
    };

    let mut segments: Vec<&str> = path
        .trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let mut version = None;
    if segments.len() >= 2 && segments[segments.len() - 2] == HISTORY_SEGMENT {
        version = segments.pop().map(str::to_string);
        segments.pop();
    }

    let id = segments
        .pop()
        .ok_or_else(|| FhirError::InvalidReference(format!("no id in {reference}")))?
        .to_string();

    // With a scheme the first segment is the host, so it never counts as a type.
    let type_floor = usize::from(scheme_prefix.is_some());
    let resource_type = if segments.len() > type_floor {
        segments.pop().map(str::to_string)
    } else {
        None
    };

    let base_url = match scheme_prefix {
        Some(scheme) if !segments.is_empty() => Some(format!("{scheme}://{}", segments.join("/"))),
        _ if !segments.is_empty() => Some(segments.join("/")),
        _ => None,
    };

    Ok(ParsedReference {
        base_url,
        resource_type,
        id,
        version,
    })
}

/// Returns the id part of a reference or resource id.
///
/// Resource ids are usually bare (`1`), but some servers return them qualified
/// (`Encounter/1` or a full URL). Unparseable values yield `None`.
pub fn id_part(value: &str) -> Option<String> {
    parse_reference(value).ok().map(|r| r.id)
}
