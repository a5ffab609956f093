//! Outline parsing and heading cleanup.
//!
//! The outline planner answers with a JSON list of headings. Headings that
//! need external evidence carry the [`SEARCH_MARKER`] token, which is removed
//! before display.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

/// Token the planner appends to headings that need a web search.
pub const SEARCH_MARKER: &str = "(requires_search)";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[(\[]\s*requires[_ ]search\s*[)\]]\s*").expect("valid regex")
});
static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d{1,2}[.)]|[-*•])\s+").expect("valid regex"));
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*\n?(.*?)\n?\s*```\s*$").expect("valid regex")
});

/// One planned section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Display heading, marker removed.
    pub heading: String,
    /// Whether the section should be grounded in a web search.
    pub requires_search: bool,
}

impl OutlineEntry {
    /// Builds an entry from a raw planner heading.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOutline`] when nothing is left after cleanup.
    pub fn from_raw(raw: &str) -> Result<Self> {
        let requires_search = MARKER_RE.is_match(raw);
        let heading = clean_heading(raw);
        if heading.is_empty() {
            return Err(Error::invalid_outline(format!(
                "heading {raw:?} is empty after cleanup"
            )));
        }
        Ok(Self {
            heading,
            requires_search,
        })
    }
}

/// Remove the search marker and list numbering from a raw heading.
#[must_use]
pub fn clean_heading(raw: &str) -> String {
    let without_marker = MARKER_RE.replace_all(raw, " ");
    let without_numbering = NUMBERING_RE.replace(without_marker.trim(), "");
    without_numbering
        .trim()
        .trim_end_matches([':', '-'])
        .trim()
        .to_owned()
}

/// Parse the planner response into at most `max_sections` entries.
///
/// Accepts a JSON array of strings, optionally wrapped in a code fence, or an
/// object holding such an array (e.g. `{"outline": [...]}`).
///
/// # Errors
///
/// [`Error::InvalidOutline`] when the text is not such a list, the list is
/// empty, or any entry is not a non-empty string.
pub fn parse_outline(text: &str, max_sections: usize) -> Result<Vec<OutlineEntry>> {
    let body = FENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str())
        .trim();

    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::invalid_outline(format!("not valid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let key = ["outline", "headings", "sections"]
                .into_iter()
                .find(|k| map.get(*k).is_some_and(Value::is_array))
                .map(str::to_owned)
                .or_else(|| {
                    map.iter()
                        .find(|(_, v)| v.is_array())
                        .map(|(k, _)| k.clone())
                })
                .ok_or_else(|| Error::invalid_outline("JSON object holds no list of headings"))?;
            match map.remove(&key) {
                Some(Value::Array(items)) => items,
                _ => return Err(Error::invalid_outline("JSON object holds no list of headings")),
            }
        }
        other => {
            return Err(Error::invalid_outline(format!(
                "expected a list of headings, got {other}"
            )));
        }
    };

    if items.is_empty() {
        return Err(Error::invalid_outline("outline is empty"));
    }

    let mut entries = items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(raw) => OutlineEntry::from_raw(raw),
            other => Err(Error::invalid_outline(format!(
                "entry {i} is not a string: {other}"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    if entries.len() > max_sections {
        warn!(
            requested = max_sections,
            received = entries.len(),
            "outline longer than requested, truncating"
        );
        entries.truncate(max_sections);
    }

    Ok(entries)
}

/// Remove heading lines at the top of `body` that repeat `heading`.
///
/// Every consecutive echo is removed in one pass, so applying the function
/// to its own output changes nothing.
#[must_use]
pub fn strip_leading_heading(body: &str, heading: &str) -> String {
    let target = normalize_heading(heading);
    let mut rest = body.trim();

    while !target.is_empty() {
        let (first_line, remainder) = rest.split_once('\n').unwrap_or((rest, ""));
        if normalize_heading(first_line) != target {
            break;
        }
        rest = remainder.trim();
    }

    rest.to_owned()
}

fn normalize_heading(line: &str) -> String {
    let line = line.trim().trim_start_matches('#').trim();
    let line = line
        .strip_prefix("**")
        .and_then(|l| l.strip_suffix("**"))
        .unwrap_or(line);
    clean_heading(line).to_lowercase()
}
