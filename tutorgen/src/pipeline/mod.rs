//! Tutorial generation pipeline.
//!
//! A run goes through these states:
//!
//! ```text
//! Idle -> AnalyzingTopic -> GeneratingOutline
//!      -> [ResolvingSearch? -> GeneratingContent -> Recording]*
//!      -> Complete | Failed
//! ```
//!
//! Sections are produced strictly one after another, each seeing a summary
//! of the one before it. A failed per-section search is logged and the
//! section is written without search context; any other failure ends the run
//! and keeps the sections recorded so far.
//!
//! # Example
//!
//! ```rust,ignore
//! use tutorgen::prelude::*;
//!
//! let pipeline = TutorialPipeline::new(invoker).with_resolver(resolver);
//! let run = pipeline
//!     .run(TutorialRequest::new("Rust ownership"), &(), &CancelSignal::new())
//!     .await;
//! println!("{}", run.to_markdown());
//! ```

mod cancel;
mod context;
mod observer;
mod state;
mod store;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{Error, LlmError, Result};
use crate::invoker::Invoker;
use crate::outline::{self, OutlineEntry};
use crate::prompts;
use crate::search::{ResolvedSearch, SearchResolver};

pub use cancel::CancelSignal;
pub use context::{PipelineContext, SUMMARY_CHARS, TutorialRequest, summarize_section};
pub use observer::{ChannelObserver, PipelineEvent, PipelineObserver};
pub use state::{RunState, RunStatus, TutorialRun};
pub use store::{ProgressiveOutputStore, SectionArtifact, Source};

static JSON_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*\n?(.*?)\n?\s*```\s*$").expect("valid regex")
});

/// How the topic analysis result is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSensitivity {
    /// The result only changes the outline instruction; the planner decides
    /// which headings get marked.
    #[default]
    Advisory,
    /// A time-sensitive topic marks every parsed heading for search.
    ForceSearch,
}

/// Pipeline options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Run the topic analysis stage.
    pub analyze_topic: bool,
    /// How a time-sensitive classification is applied.
    pub time_sensitivity: TimeSensitivity,
    /// Temperature for outline planning.
    pub outline_temperature: f32,
    /// Temperature for section writing.
    pub content_temperature: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analyze_topic: true,
            time_sensitivity: TimeSensitivity::Advisory,
            outline_temperature: 0.4,
            content_temperature: 0.7,
        }
    }
}

impl PipelineConfig {
    /// Enables or disables topic analysis.
    #[must_use]
    pub const fn with_analysis(mut self, enabled: bool) -> Self {
        self.analyze_topic = enabled;
        self
    }

    /// Sets the time-sensitivity policy.
    #[must_use]
    pub const fn with_time_sensitivity(mut self, policy: TimeSensitivity) -> Self {
        self.time_sensitivity = policy;
        self
    }
}

/// Failure of one stage, carried up to the run result.
struct StageFailure {
    stage: RunState,
    error: Error,
}

/// Tracks the current state and reports transitions.
struct Progress<'a, O> {
    observer: &'a O,
    cancel: &'a CancelSignal,
    state: RunState,
}

impl<O: PipelineObserver> Progress<'_, O> {
    /// Checks for cancellation, then moves to `next`.
    async fn enter(&mut self, next: RunState) -> std::result::Result<(), StageFailure> {
        if self.cancel.is_cancelled() {
            return Err(self.fail(Error::Cancelled {
                reason: self.cancel.reason().map(str::to_owned),
            }));
        }
        self.transition(next).await;
        Ok(())
    }

    /// Moves to `next` without a cancellation check.
    async fn transition(&mut self, next: RunState) {
        self.state = next;
        debug!(state = %next, "entering state");
        self.observer.on_state(next).await;
    }

    async fn activity(&self, activity: &str) {
        self.observer.on_activity(activity).await;
    }

    fn fail(&self, error: Error) -> StageFailure {
        StageFailure {
            stage: self.state,
            error,
        }
    }
}

/// Runs topic analysis, outline planning and per-section writing.
#[derive(Debug)]
pub struct TutorialPipeline {
    invoker: Invoker,
    resolver: Option<SearchResolver>,
    config: PipelineConfig,
}

impl TutorialPipeline {
    /// Creates a pipeline without web search.
    #[must_use]
    pub fn new(invoker: Invoker) -> Self {
        Self {
            invoker,
            resolver: None,
            config: PipelineConfig::default(),
        }
    }

    /// Enables per-section web search.
    #[must_use]
    pub fn with_resolver(mut self, resolver: SearchResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets pipeline options.
    #[must_use]
    pub const fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Pipeline options.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The invoker every model call goes through.
    #[must_use]
    pub const fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Generates a tutorial for `request`.
    ///
    /// Never returns an error: failures end the run with
    /// [`RunStatus::Failed`] and the returned [`TutorialRun`] holds whatever
    /// was recorded before the failure.
    pub async fn run<O: PipelineObserver>(
        &self,
        request: TutorialRequest,
        observer: &O,
        cancel: &CancelSignal,
    ) -> TutorialRun {
        let id = Uuid::new_v4();
        let span = info_span!("tutorial_run", run_id = %id, topic = %request.topic);

        async move {
            info!(sections = request.num_sections, "starting tutorial run");

            let mut progress = Progress {
                observer,
                cancel,
                state: RunState::Idle,
            };
            let mut store = ProgressiveOutputStore::new();
            let mut outline = Vec::new();

            let result = self
                .drive(&request, &mut progress, &mut store, &mut outline)
                .await;

            let (status, terminal) = match result {
                Ok(()) => {
                    info!(sections = store.len(), "tutorial run complete");
                    (RunStatus::Complete, RunState::Complete)
                }
                Err(StageFailure { stage, error }) => {
                    warn!(
                        stage = %stage,
                        error = %error,
                        recorded = store.len(),
                        "tutorial run failed"
                    );
                    (RunStatus::Failed { stage, error }, RunState::Failed)
                }
            };

            observer.on_state(terminal).await;
            observer.on_finish(&status).await;

            TutorialRun {
                id,
                request,
                outline,
                sections: store.into_sections(),
                status,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive<O: PipelineObserver>(
        &self,
        request: &TutorialRequest,
        progress: &mut Progress<'_, O>,
        store: &mut ProgressiveOutputStore,
        outline_out: &mut Vec<OutlineEntry>,
    ) -> std::result::Result<(), StageFailure> {
        request.validate().map_err(|e| progress.fail(e))?;
        store.reset();
        let mut ctx = PipelineContext::new(request);

        let time_sensitive = if self.config.analyze_topic {
            progress.enter(RunState::AnalyzingTopic).await?;
            progress.activity("Analyzing topic").await;
            self.analyze_topic(&ctx.topic)
                .await
                .map_err(|e| progress.fail(e))?
        } else {
            false
        };

        progress.enter(RunState::GeneratingOutline).await?;
        progress
            .activity(&format!("Planning {} sections", request.num_sections))
            .await;
        let mut entries = self
            .generate_outline(&ctx, request.num_sections, time_sensitive)
            .await
            .map_err(|e| progress.fail(e))?;

        if time_sensitive && self.config.time_sensitivity == TimeSensitivity::ForceSearch {
            for entry in &mut entries {
                entry.requires_search = true;
            }
        }

        info!(
            sections = entries.len(),
            searched = entries.iter().filter(|e| e.requires_search).count(),
            "outline ready"
        );
        ctx.set_outline(entries.clone());
        outline_out.clone_from(&entries);

        let total = entries.len();
        for (index, entry) in entries.iter().enumerate() {
            let search = if entry.requires_search {
                progress.enter(RunState::ResolvingSearch { index }).await?;
                let query = prompts::search_query(&ctx.topic, &entry.heading);
                progress.activity(&format!("Searching: {query}")).await;
                self.resolve_search(&query).await.map_err(|e| progress.fail(e))?
            } else {
                None
            };

            progress.enter(RunState::GeneratingContent { index }).await?;
            progress
                .activity(&format!("Writing section {}/{total}: {}", index + 1, entry.heading))
                .await;
            let body = self
                .write_section(&ctx, entry, search.as_ref())
                .await
                .map_err(|e| progress.fail(Error::content_failed(&entry.heading, e)))?;

            // A written section is always kept; cancellation is seen before the next one.
            progress.transition(RunState::Recording { index }).await;
            let sources = search
                .as_ref()
                .map(|s| s.sources.iter().map(Source::from).collect())
                .unwrap_or_default();
            let artifact = SectionArtifact::new(entry.heading.clone(), body, sources);
            ctx.record(&artifact);
            let artifact = store.append(artifact);
            info!(index, heading = %artifact.heading, "section recorded");
            progress.observer.on_section(index, artifact).await;
        }

        Ok(())
    }

    /// Asks whether the topic is time-sensitive.
    ///
    /// An answer that cannot be read is treated as "not time-sensitive";
    /// invoker failures propagate.
    async fn analyze_topic(&self, topic: &str) -> Result<bool> {
        let response = self
            .invoker
            .invoke(|| prompts::topic_analysis(topic))
            .await?;

        let time_sensitive = parse_time_sensitive(&response.text).unwrap_or_else(|| {
            warn!(response = %response.text, "unreadable topic analysis, assuming not time-sensitive");
            false
        });
        info!(time_sensitive, "topic analyzed");
        Ok(time_sensitive)
    }

    async fn generate_outline(
        &self,
        ctx: &PipelineContext,
        num_sections: usize,
        time_sensitive: bool,
    ) -> Result<Vec<OutlineEntry>> {
        let temperature = self.config.outline_temperature;
        let response = self
            .invoker
            .invoke(|| prompts::outline(ctx, num_sections, time_sensitive).temperature(temperature))
            .await?;
        outline::parse_outline(&response.text, num_sections)
    }

    /// Runs the search for one section. `SearchUnavailable` is absorbed.
    async fn resolve_search(&self, query: &str) -> Result<Option<ResolvedSearch>> {
        let Some(resolver) = &self.resolver else {
            warn!(query, "section needs search but no resolver is configured");
            return Ok(None);
        };

        match resolver.resolve(query).await {
            Ok(resolved) => {
                debug!(query, sources = resolved.sources.len(), "search resolved");
                Ok(Some(resolved))
            }
            Err(err) if err.is_recoverable() => {
                warn!(query, error = %err, "search failed, writing section without it");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn write_section(
        &self,
        ctx: &PipelineContext,
        entry: &OutlineEntry,
        search: Option<&ResolvedSearch>,
    ) -> Result<String> {
        let temperature = self.config.content_temperature;
        let search_context = search.map(|s| s.context.as_str());
        let response = self
            .invoker
            .invoke(|| prompts::content(ctx, entry, search_context).temperature(temperature))
            .await?;

        non_empty_body(&response.text, &entry.heading)
    }

    /// Rewrites `artifact` for beginners, in `language`.
    ///
    /// Returns a new artifact with the same heading and sources; the input
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Invoker errors, or an empty rewrite.
    pub async fn simplify(&self, artifact: &SectionArtifact, language: &str) -> Result<SectionArtifact> {
        info!(heading = %artifact.heading, "simplifying section");
        let response = self
            .invoker
            .invoke(|| prompts::simplify(artifact, language))
            .await?;
        let body = non_empty_body(&response.text, &artifact.heading)?;

        Ok(SectionArtifact::new(
            artifact.heading.clone(),
            body,
            artifact.sources.clone(),
        ))
    }
}

fn non_empty_body(text: &str, heading: &str) -> Result<String> {
    let body = outline::strip_leading_heading(text, heading);
    if body.is_empty() {
        return Err(LlmError::response_format("markdown section body", "empty response").into());
    }
    Ok(body)
}

/// Reads `{"time_sensitive": ...}`, tolerating a code fence and string booleans.
fn parse_time_sensitive(text: &str) -> Option<bool> {
    let body = JSON_FENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());
    let value: Value = serde_json::from_str(body.trim()).ok()?;

    match value.get("time_sensitive")? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
