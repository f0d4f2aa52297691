//! XHTML narrative handling for composition sections.
//!
//! Two operations over a section's `text.div`:
//! - [`normalize`] re-serialises the markup for embedding in the report, dropping the
//!   namespace attribute on `<tbody>` and giving every `<th>` the table header class.
//! - [`first_div_text`] returns the whitespace-collapsed text content of the first `<div>`.

use crate::constants::TABLE_HEADER_CLASS;
use crate::{ReportError, ReportResult};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::io::Cursor;

const INLINE_ELEMENTS: &[&[u8]] = &[b"a", b"b", b"em", b"i", b"span", b"strong", b"u"];

/// Re-serialise narrative XHTML with report table conventions applied.
///
/// # Errors
///
/// Returns [`ReportError::Narrative`] if the markup is not well formed.
pub fn normalize(xhtml: &str) -> ReportResult<String> {
    let mut reader = Reader::from_str(xhtml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                depth += 1;
                writer.write_event(Event::Start(rewrite_element(&start)?))?;
            }
            Event::Empty(empty) => {
                writer.write_event(Event::Empty(rewrite_element(&empty)?))?;
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(end))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    if depth != 0 {
        return Err(ReportError::Narrative("unclosed element".into()));
    }

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| ReportError::Narrative(e.to_string()))
}

fn rewrite_element(element: &BytesStart<'_>) -> ReportResult<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut rewritten = BytesStart::new(name.clone());
    let mut has_class = false;

    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = attribute.key.as_ref();
        if name == "tbody" && key == b"xmlns" {
            continue;
        }
        has_class |= key == b"class";
        rewritten.push_attribute(attribute);
    }

    if name == "th" && !has_class {
        rewritten.push_attribute(("class", TABLE_HEADER_CLASS));
    }
    Ok(rewritten.into_owned())
}

/// Text content of the first `<div>` element, whitespace collapsed.
///
/// Returns `Ok(None)` when the markup has no `<div>`.
///
/// # Errors
///
/// Returns [`ReportError::Narrative`] if the markup is not well formed.
pub fn first_div_text(xhtml: &str) -> ReportResult<Option<String>> {
    let mut reader = Reader::from_str(xhtml);
    let mut depth_in_div: Option<usize> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => match depth_in_div.as_mut() {
                Some(depth) => {
                    *depth += 1;
                    if !is_inline(start.name().as_ref()) {
                        text.push(' ');
                    }
                }
                None if start.name().as_ref() == b"div" => depth_in_div = Some(0),
                None => {}
            },
            Event::End(end) => match depth_in_div {
                Some(0) => return Ok(Some(collapse_whitespace(&text))),
                Some(depth) => {
                    depth_in_div = Some(depth - 1);
                    if !is_inline(end.name().as_ref()) {
                        text.push(' ');
                    }
                }
                None => {}
            },
            Event::Empty(empty) => {
                if depth_in_div.is_none() && empty.name().as_ref() == b"div" {
                    return Ok(Some(String::new()));
                }
                if depth_in_div.is_some() && empty.name().as_ref() == b"br" {
                    text.push(' ');
                }
            }
            Event::Text(content) if depth_in_div.is_some() => {
                text.push_str(&unescape(&content)?);
            }
            Event::CData(content) if depth_in_div.is_some() => {
                text.push_str(&String::from_utf8_lossy(&content));
            }
            Event::Eof => {
                return match depth_in_div {
                    Some(_) => Err(ReportError::Narrative("unclosed <div>".into())),
                    None => Ok(None),
                };
            }
            _ => {}
        }
    }
}

fn is_inline(name: &[u8]) -> bool {
    INLINE_ELEMENTS.contains(&name)
}

fn unescape<'t>(content: &'t BytesText<'_>) -> ReportResult<Cow<'t, str>> {
    let unescaped = content.unescape_with(|entity| match entity {
        "nbsp" => Some("\u{a0}"),
        _ => None,
    })?;
    Ok(unescaped)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
