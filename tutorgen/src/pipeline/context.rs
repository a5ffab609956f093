//! Run input and the per-run generation context.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::outline::OutlineEntry;

use super::SectionArtifact;

/// Upper bound on the derived previous-section summary, in characters.
pub const SUMMARY_CHARS: usize = 600;

static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?(?:```|\z)").expect("valid regex"));
static HEADING_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s.*$").expect("valid regex"));
static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)[*`>]+|^[ \t]*[-+][ \t]+").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialRequest {
    /// Subject of the tutorial.
    pub topic: String,
    /// Who the tutorial is written for.
    pub audience: String,
    /// Output language.
    pub language: String,
    /// Number of sections to plan. Must be at least one.
    pub num_sections: usize,
}

impl TutorialRequest {
    /// Default audience.
    pub const DEFAULT_AUDIENCE: &'static str = "beginners";
    /// Default output language.
    pub const DEFAULT_LANGUAGE: &'static str = "English";
    /// Default section count.
    pub const DEFAULT_SECTIONS: usize = 5;

    /// Creates a request with default audience, language and length.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            audience: Self::DEFAULT_AUDIENCE.to_owned(),
            language: Self::DEFAULT_LANGUAGE.to_owned(),
            num_sections: Self::DEFAULT_SECTIONS,
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Sets the output language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the number of sections.
    #[must_use]
    pub const fn sections(mut self, num_sections: usize) -> Self {
        self.num_sections = num_sections;
        self
    }

    /// Checks the request before any model call is made.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] for a blank topic or zero sections.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::invalid_request("topic must not be empty"));
        }
        if self.num_sections == 0 {
            return Err(Error::invalid_request("at least one section is required"));
        }
        Ok(())
    }
}

/// Everything content generation needs to know about the run so far.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    /// Subject of the tutorial.
    pub topic: String,
    /// Target audience.
    pub audience: String,
    /// Output language.
    pub language: String,
    outline: Vec<OutlineEntry>,
    previous_summary: Option<String>,
}

impl PipelineContext {
    /// Starts a context for `request` with no outline yet.
    #[must_use]
    pub fn new(request: &TutorialRequest) -> Self {
        Self {
            topic: request.topic.trim().to_owned(),
            audience: request.audience.trim().to_owned(),
            language: request.language.trim().to_owned(),
            outline: Vec::new(),
            previous_summary: None,
        }
    }

    /// Installs the parsed outline.
    pub fn set_outline(&mut self, outline: Vec<OutlineEntry>) {
        self.outline = outline;
    }

    /// The full outline.
    #[must_use]
    pub fn outline(&self) -> &[OutlineEntry] {
        &self.outline
    }

    /// Outline headings in order.
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.outline.iter().map(|e| e.heading.as_str())
    }

    /// Summary of the most recently recorded section.
    #[must_use]
    pub fn previous_summary(&self) -> Option<&str> {
        self.previous_summary.as_deref()
    }

    /// Derives the previous-section summary from a just-recorded section.
    pub fn record(&mut self, artifact: &SectionArtifact) {
        self.previous_summary = Some(summarize_section(artifact));
    }
}

/// Condenses a section into a short plain-text summary.
///
/// Code blocks, headings and inline markup are dropped and the text is cut
/// at a word boundary near [`SUMMARY_CHARS`].
#[must_use]
pub fn summarize_section(artifact: &SectionArtifact) -> String {
    let text = CODE_BLOCK_RE.replace_all(&artifact.markdown_body, " ");
    let text = HEADING_LINE_RE.replace_all(&text, " ");
    let text = MARKUP_RE.replace_all(&text, "");
    let text = SPACE_RE.replace_all(&text, " ");
    let text = text.trim();

    let excerpt = if text.chars().count() <= SUMMARY_CHARS {
        text.to_owned()
    } else {
        let cut: String = text.chars().take(SUMMARY_CHARS).collect();
        let cut = cut.rsplit_once(' ').map_or(cut.as_str(), |(head, _)| head);
        format!("{}...", cut.trim_end_matches([',', ';', ':', '.']))
    };

    if excerpt.is_empty() {
        format!("\"{}\"", artifact.heading)
    } else {
        format!("\"{}\": {excerpt}", artifact.heading)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod request {
        use super::*;

        #[test]
        fn defaults_and_builders() {
            let req = TutorialRequest::new("Rust")
                .audience("students")
                .language("German")
                .sections(3);
            assert_eq!(req.audience, "students");
            assert_eq!(req.language, "German");
            assert_eq!(req.num_sections, 3);
            assert!(req.validate().is_ok());

            let defaults = TutorialRequest::new("Rust");
            assert_eq!(defaults.num_sections, TutorialRequest::DEFAULT_SECTIONS);
        }

        #[test]
        fn rejects_zero_sections_and_blank_topic() {
            assert!(matches!(
                TutorialRequest::new("Rust").sections(0).validate(),
                Err(Error::InvalidRequest(_))
            ));
            assert!(matches!(
                TutorialRequest::new("   ").validate(),
                Err(Error::InvalidRequest(_))
            ));
        }
    }

    mod summary {
        use super::*;

        fn artifact(body: &str) -> SectionArtifact {
            SectionArtifact::new("Basics", body, Vec::new())
        }

        #[test]
        fn drops_code_and_headings() {
            let body = "### Setup\nInstall **cargo** first.\n\n```rust\nfn main() {}\n```\n\n- Then run it.";
            assert_eq!(
                summarize_section(&artifact(body)),
                "\"Basics\": Install cargo first. Then run it."
            );
        }

        #[test]
        fn truncates_at_word_boundary() {
            let body = "word ".repeat(400);
            let summary = summarize_section(&artifact(&body));
            assert!(summary.ends_with("word..."));
            assert!(summary.chars().count() <= SUMMARY_CHARS + 20);
        }

        #[test]
        fn context_tracks_latest_section() {
            let mut ctx = PipelineContext::new(&TutorialRequest::new(" Rust "));
            assert_eq!(ctx.topic, "Rust");
            assert!(ctx.previous_summary().is_none());

            ctx.record(&artifact("First."));
            ctx.record(&SectionArtifact::new("Next", "Second.", Vec::new()));
            assert_eq!(ctx.previous_summary(), Some("\"Next\": Second."));
        }
    }
}
