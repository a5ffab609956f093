//! Minimal HTML text extraction for scraped result pages.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// Strip tags, decode entities and collapse whitespace.
pub fn to_text(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, "");
    let text = decode_entities(&text);
    SPACE_RE.replace_all(&text, " ").trim().to_owned()
}

/// Decode the named entities search pages use plus numeric references.
pub fn decode_entities(text: &str) -> String {
    let named = text
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures<'_>| {
        let raw = &caps[1];
        let code = raw
            .strip_prefix('x')
            .map_or_else(|| raw.parse::<u32>().ok(), |hex| u32::from_str_radix(hex, 16).ok());
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_owned(), String::from)
    });

    // Ampersand last so "&amp;lt;" stays "&lt;".
    numeric.replace("&amp;", "&")
}
