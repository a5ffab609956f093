//! Terminal progress display for a pipeline run.

use std::io::Write;

use tutorgen::pipeline::{PipelineObserver, RunState, RunStatus, SectionArtifact};

/// Prints run progress to stderr, keeping stdout free for the tutorial.
#[derive(Debug, Clone, Copy)]
pub struct TerminalObserver {
    total: usize,
    quiet: bool,
}

impl TerminalObserver {
    /// Creates a display for a run of `total` planned sections; `quiet`
    /// suppresses activity lines.
    #[must_use]
    pub const fn new(total: usize, quiet: bool) -> Self {
        Self { total, quiet }
    }

    fn line(text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{text}");
    }
}

impl PipelineObserver for TerminalObserver {
    async fn on_state(&self, state: RunState) {
        if matches!(state, RunState::GeneratingOutline | RunState::AnalyzingTopic) {
            Self::line(&format!("> {state}"));
        }
    }

    async fn on_activity(&self, activity: &str) {
        if !self.quiet {
            Self::line(&format!("  {activity}..."));
        }
    }

    async fn on_section(&self, index: usize, artifact: &SectionArtifact) {
        let sources = if artifact.sources.is_empty() {
            String::new()
        } else {
            format!(" ({} sources)", artifact.sources.len())
        };
        Self::line(&format!(
            "[{}/{}] {}{sources}",
            index + 1,
            self.total,
            artifact.heading
        ));
    }

    async fn on_finish(&self, status: &RunStatus) {
        match status {
            RunStatus::Complete => Self::line("Done."),
            RunStatus::Failed { .. } => Self::line(&format!("Stopped: {status}")),
        }
    }
}
