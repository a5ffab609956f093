//! Observer hooks for a pipeline run.
//!
//! A display layer implements [`PipelineObserver`] to follow a run as it
//! happens. All methods have default no-op implementations, so you only need
//! to implement the ones you're interested in.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{RunState, RunStatus, SectionArtifact};

/// Callbacks invoked by the pipeline while it runs.
pub trait PipelineObserver: Send + Sync {
    /// Called when the run enters a new state.
    #[allow(unused_variables)]
    fn on_state(&self, state: RunState) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called with a short description of what the run is doing right now.
    #[allow(unused_variables)]
    fn on_activity(&self, activity: &str) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called after each section is appended to the output store.
    #[allow(unused_variables)]
    fn on_section(&self, index: usize, artifact: &SectionArtifact) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called once with the terminal status.
    #[allow(unused_variables)]
    fn on_finish(&self, status: &RunStatus) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// No-op observer.
impl PipelineObserver for () {}

/// A pipeline event, as forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
#[non_exhaustive]
pub enum PipelineEvent {
    /// The run entered a new state.
    State(RunState),
    /// Current activity text.
    Activity(String),
    /// A section was recorded.
    Section {
        /// Position in the outline.
        index: usize,
        /// The recorded section.
        artifact: SectionArtifact,
    },
    /// The run finished with every section recorded.
    Completed,
    /// The run stopped early.
    Failed {
        /// State the run was in when it stopped.
        stage: RunState,
        /// Error message.
        message: String,
    },
}

/// Forwards every callback as a [`PipelineEvent`] on an unbounded channel.
///
/// Sending never blocks the run. Events sent after the receiver is dropped
/// are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

impl PipelineObserver for ChannelObserver {
    async fn on_state(&self, state: RunState) {
        self.send(PipelineEvent::State(state));
    }

    async fn on_activity(&self, activity: &str) {
        self.send(PipelineEvent::Activity(activity.to_owned()));
    }

    async fn on_section(&self, index: usize, artifact: &SectionArtifact) {
        self.send(PipelineEvent::Section {
            index,
            artifact: artifact.clone(),
        });
    }

    async fn on_finish(&self, status: &RunStatus) {
        let event = match status {
            RunStatus::Complete => PipelineEvent::Completed,
            RunStatus::Failed { stage, error } => PipelineEvent::Failed {
                stage: *stage,
                message: error.to_string(),
            },
        };
        self.send(event);
    }
}
