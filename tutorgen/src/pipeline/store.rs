//! Finished sections and the append-only store that collects them.

use serde::{Deserialize, Serialize};

use crate::search::SearchResult;

/// A reference a section was grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    /// Page title.
    pub title: String,
    /// Page address.
    pub uri: String,
}

impl From<&SearchResult> for Source {
    fn from(result: &SearchResult) -> Self {
        Self {
            title: result.title.clone(),
            uri: result.link.clone(),
        }
    }
}

/// One generated section. Never modified after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionArtifact {
    /// Outline heading, marker removed.
    pub heading: String,
    /// Markdown body without the heading line.
    pub markdown_body: String,
    /// Search results the body was written from.
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl SectionArtifact {
    /// Creates an artifact.
    #[must_use]
    pub fn new(
        heading: impl Into<String>,
        markdown_body: impl Into<String>,
        sources: Vec<Source>,
    ) -> Self {
        Self {
            heading: heading.into(),
            markdown_body: markdown_body.into(),
            sources,
        }
    }
}

/// Ordered, append-only list of finished sections.
///
/// Sections are only ever pushed at the end. [`reset`](Self::reset) is the
/// single way to drop them and is called when a new run starts.
#[derive(Debug, Clone, Default)]
pub struct ProgressiveOutputStore {
    sections: Vec<SectionArtifact>,
}

impl ProgressiveOutputStore {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Appends `artifact` and returns it as stored.
    pub fn append(&mut self, artifact: SectionArtifact) -> &SectionArtifact {
        self.sections.push(artifact);
        &self.sections[self.sections.len() - 1]
    }

    /// Drops every section.
    pub fn reset(&mut self) {
        self.sections.clear();
    }

    /// Sections in append order.
    #[must_use]
    pub fn sections(&self) -> &[SectionArtifact] {
        &self.sections
    }

    /// Number of recorded sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Consumes the store, returning its sections.
    #[must_use]
    pub fn into_sections(self) -> Vec<SectionArtifact> {
        self.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_order() {
        let mut store = ProgressiveOutputStore::new();
        assert!(store.is_empty());

        let stored = store.append(SectionArtifact::new("A", "a", Vec::new()));
        assert_eq!(stored.heading, "A");
        store.append(SectionArtifact::new("B", "b", Vec::new()));

        let headings: Vec<&str> = store.sections().iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["A", "B"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn reset_clears() {
        let mut store = ProgressiveOutputStore::new();
        store.append(SectionArtifact::new("A", "a", Vec::new()));
        store.reset();
        assert!(store.is_empty());
    }

    #[test]
    fn source_from_search_result() {
        let result = SearchResult::new("Rust", "https://rust-lang.org", "snippet");
        let source = Source::from(&result);
        assert_eq!(source.title, "Rust");
        assert_eq!(source.uri, "https://rust-lang.org");
    }
}
