//! Display formatting for FHIR dates and date-times.
//!
//! Dates render as `dd-MMM-yyyy`. Date-times render in the display timezone as
//! `dd-MMM-yyyy, HH:mm <zone>` whatever offset they were stored with.

use crate::constants::{DISPLAY_TIMEZONE, UNKNOWN};
use fhir::FhirDateTime;

const DATE_FORMAT: &str = "%d-%b-%Y";
const DATE_TIME_FORMAT: &str = "%d-%b-%Y, %H:%M %Z";
const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Format a FHIR `date` or `dateTime` as `dd-MMM-yyyy`, or "Unknown".
pub fn format_date(value: Option<&str>) -> String {
    value
        .and_then(FhirDateTime::parse)
        .map(|dt| dt.date().format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Format a FHIR `dateTime` in the display timezone, or "Unknown".
pub fn format_date_time(value: Option<&str>) -> String {
    value
        .and_then(display_date_time)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Format a FHIR `dateTime` in the display timezone. `None` if malformed.
pub fn display_date_time(value: &str) -> Option<String> {
    FhirDateTime::parse(value).map(|dt| {
        dt.instant()
            .with_timezone(&DISPLAY_TIMEZONE)
            .format(DATE_TIME_FORMAT)
            .to_string()
    })
}

/// Format a FHIR `date` as `yyyyMMdd` for filenames. `None` if absent or malformed.
pub fn compact_date(value: &str) -> Option<String> {
    FhirDateTime::parse(value).map(|dt| dt.date().format(COMPACT_DATE_FORMAT).to_string())
}
