//! Run states and the run result.

use std::collections::HashSet;
use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::outline::OutlineEntry;

use super::{SectionArtifact, TutorialRequest};

/// Where a run currently is.
///
/// Section indices are zero-based; `Display` prints them one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Not started.
    Idle,
    /// Classifying whether the topic is time-sensitive.
    AnalyzingTopic,
    /// Planning the section headings.
    GeneratingOutline,
    /// Searching the web for one section.
    ResolvingSearch {
        /// Section index.
        index: usize,
    },
    /// Writing one section.
    GeneratingContent {
        /// Section index.
        index: usize,
    },
    /// Appending a finished section to the output.
    Recording {
        /// Section index.
        index: usize,
    },
    /// Every section was recorded.
    Complete,
    /// The run stopped early.
    Failed,
}

impl RunState {
    /// Whether the run can no longer change state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AnalyzingTopic => write!(f, "analyzing topic"),
            Self::GeneratingOutline => write!(f, "generating outline"),
            Self::ResolvingSearch { index } => write!(f, "resolving search for section {}", index + 1),
            Self::GeneratingContent { index } => write!(f, "generating section {}", index + 1),
            Self::Recording { index } => write!(f, "recording section {}", index + 1),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Final outcome of a run.
#[derive(Debug)]
pub enum RunStatus {
    /// Every outline entry produced a section.
    Complete,
    /// The run stopped at `stage`; recorded sections are kept.
    Failed {
        /// State the run was in when it stopped.
        stage: RunState,
        /// What stopped it.
        error: Error,
    },
}

impl RunStatus {
    /// Returns true for [`RunStatus::Complete`].
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The error that ended the run, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Complete => None,
            Self::Failed { error, .. } => Some(error),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Failed { stage, error } => write!(f, "failed while {stage}: {error}"),
        }
    }
}

/// Everything a run produced, complete or partial.
#[derive(Debug)]
pub struct TutorialRun {
    /// Identifier used in logs.
    pub id: Uuid,
    /// The input.
    pub request: TutorialRequest,
    /// Parsed outline; empty when the run failed before planning finished.
    pub outline: Vec<OutlineEntry>,
    /// Recorded sections in outline order.
    pub sections: Vec<SectionArtifact>,
    /// Final outcome.
    pub status: RunStatus,
}

impl TutorialRun {
    /// Renders the run as one markdown document.
    ///
    /// Works on partial runs: only recorded sections are included. Sources
    /// are listed once each, in first-seen order.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut doc = format!("# {}\n", self.request.topic.trim());

        for section in &self.sections {
            let _ = write!(
                doc,
                "\n## {}\n\n{}\n",
                section.heading,
                section.markdown_body.trim()
            );
        }

        let mut seen = HashSet::new();
        let sources: Vec<_> = self
            .sections
            .iter()
            .flat_map(|s| &s.sources)
            .filter(|s| seen.insert(s.uri.clone()))
            .collect();

        if !sources.is_empty() {
            doc.push_str("\n## Sources\n\n");
            for source in sources {
                let _ = writeln!(doc, "- [{}]({})", source.title, source.uri);
            }
        }

        doc
    }
}
