//! Integration tests for the tutorial pipeline.

#![allow(clippy::unwrap_used, clippy::panic, clippy::clone_on_ref_ptr)]

use std::sync::Arc;

use tutorgen::mock::{MockCall, MockModel, MockSearch};
use tutorgen::prelude::*;

const OUTLINE: &str = r#"["A", "B (requires_search)", "C"]"#;

/// Extracts the heading a content request is asking for.
fn requested_heading(prompt: &str) -> String {
    let start = prompt.find("Write the section \"").unwrap() + "Write the section \"".len();
    let len = prompt[start..].find('"').unwrap();
    prompt[start..start + len].to_owned()
}

/// Responder that answers every agent role with well-formed output.
fn scripted(
    outline: &'static str,
    time_sensitive: bool,
) -> impl Fn(&MockCall) -> std::result::Result<String, LlmError> + Send + Sync + 'static {
    move |call| match call.request.agent {
        AgentRole::TopicAnalyst => Ok(format!(r#"{{"time_sensitive": {time_sensitive}}}"#)),
        AgentRole::OutlinePlanner => Ok(outline.to_owned()),
        AgentRole::SearchSummarizer => Ok("search summary".to_owned()),
        AgentRole::ContentWriter => {
            let heading = requested_heading(&call.request.prompt);
            Ok(format!("## {heading}\n\nBody of {heading}."))
        }
        AgentRole::Simplifier => Ok("Simpler body.".to_owned()),
    }
}

fn results(n: usize) -> Vec<SearchResult> {
    (0..n)
        .map(|i| SearchResult::new(format!("Result {i}"), format!("https://example.com/{i}"), "snippet"))
        .collect()
}

fn invoker(model: &Arc<MockModel>, keys: &[&str]) -> Invoker {
    let pool = Arc::new(KeyPool::new(keys.iter().copied()).unwrap());
    Invoker::new(pool, model.clone() as SharedModelProvider)
}

fn headings(run: &TutorialRun) -> Vec<&str> {
    run.sections.iter().map(|s| s.heading.as_str()).collect()
}

fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Full runs
// ============================================================================

#[tokio::test]
async fn test_complete_run_with_marked_section() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let search = Arc::new(MockSearch::returning("primary", results(3)));
    let invoker = invoker(&model, &["k1"]);
    let resolver = SearchResolver::new(invoker.clone()).shared_strategy(search.clone());
    let pipeline = TutorialPipeline::new(invoker).with_resolver(resolver);

    let (observer, rx) = ChannelObserver::new();
    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &observer, &CancelSignal::new())
        .await;

    assert!(run.status.is_complete(), "status: {}", run.status);
    assert_eq!(headings(&run), vec!["A", "B", "C"]);
    assert_eq!(
        run.outline.iter().map(|e| e.requires_search).collect::<Vec<_>>(),
        vec![false, true, false]
    );

    // Only the marked heading triggered a search.
    assert_eq!(search.queries().await, vec!["Rust B"]);
    assert!(run.sections[0].sources.is_empty());
    assert_eq!(run.sections[1].sources.len(), 3);
    assert!(run.sections[2].sources.is_empty());

    // Echoed headings are stripped from bodies.
    assert_eq!(run.sections[0].markdown_body, "Body of A.");

    let calls = model.calls().await;
    let roles: Vec<AgentRole> = calls.iter().map(|c| c.request.agent).collect();
    assert_eq!(
        roles,
        vec![
            AgentRole::TopicAnalyst,
            AgentRole::OutlinePlanner,
            AgentRole::ContentWriter,
            AgentRole::SearchSummarizer,
            AgentRole::ContentWriter,
            AgentRole::ContentWriter,
        ]
    );

    // Section B sees the search summary and a summary of section A.
    let b_prompt = &calls[4].request.prompt;
    assert!(b_prompt.contains("search summary"));
    assert!(b_prompt.contains("Body of A."));

    let events = drain(rx);
    let sections: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Section { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(sections, vec![0, 1, 2]);
    assert!(events.contains(&PipelineEvent::State(RunState::ResolvingSearch { index: 1 })));
    assert!(!events.contains(&PipelineEvent::State(RunState::ResolvingSearch { index: 0 })));
    assert_eq!(events.last(), Some(&PipelineEvent::Completed));
}

#[tokio::test]
async fn test_markdown_output_of_complete_run() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let invoker = invoker(&model, &["k1"]);
    let resolver =
        SearchResolver::new(invoker.clone()).strategy(MockSearch::returning("primary", results(2)));
    let pipeline = TutorialPipeline::new(invoker).with_resolver(resolver);

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    let md = run.to_markdown();
    assert!(md.starts_with("# Rust\n"));
    assert!(md.contains("## A\n\nBody of A."));
    assert!(md.contains("## Sources"));
    assert!(md.contains("- [Result 1](https://example.com/1)"));
}

#[tokio::test]
async fn test_search_results_capped_at_eight() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let invoker = invoker(&model, &["k1"]);
    let resolver =
        SearchResolver::new(invoker.clone()).strategy(MockSearch::returning("primary", results(12)));
    let pipeline = TutorialPipeline::new(invoker).with_resolver(resolver);

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert_eq!(run.sections[1].sources.len(), 8);
}

// ============================================================================
// Search failures are absorbed
// ============================================================================

#[tokio::test]
async fn test_empty_primary_without_fallback_still_yields_artifact() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let invoker = invoker(&model, &["k1"]);
    let resolver =
        SearchResolver::new(invoker.clone()).strategy(MockSearch::returning("primary", Vec::new()));
    let pipeline = TutorialPipeline::new(invoker).with_resolver(resolver);

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.status.is_complete());
    assert_eq!(run.sections.len(), 3);
    assert_eq!(run.sections[1].heading, "B");
    assert!(run.sections[1].sources.is_empty());

    let calls = model.calls().await;
    assert!(calls.iter().all(|c| c.request.agent != AgentRole::SearchSummarizer));
    assert!(!calls[3].request.prompt.contains("Research notes"));
}

#[tokio::test]
async fn test_empty_fallback_passes_explicit_empty_context() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let invoker = invoker(&model, &["k1"]);
    let resolver = SearchResolver::new(invoker.clone())
        .strategy(MockSearch::failing("primary", SearchError::Timeout { provider: "primary" }))
        .strategy(MockSearch::returning("fallback", Vec::new()));
    let pipeline = TutorialPipeline::new(invoker).with_resolver(resolver);

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.status.is_complete());
    let calls = model.calls().await;
    let b_prompt = &calls
        .iter()
        .find(|c| c.request.prompt.contains("Write the section \"B\""))
        .unwrap()
        .request
        .prompt;
    assert!(b_prompt.contains(ResolvedSearch::EMPTY_CONTEXT));
}

#[tokio::test]
async fn test_marked_section_without_resolver() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.status.is_complete());
    assert_eq!(headings(&run), vec!["A", "B", "C"]);
}

// ============================================================================
// Fatal failures keep partial output
// ============================================================================

#[tokio::test]
async fn test_content_failure_at_second_entry() {
    let base = scripted(OUTLINE, false);
    let model = Arc::new(MockModel::new(move |call| {
        if call.request.agent == AgentRole::ContentWriter
            && requested_heading(&call.request.prompt) == "B"
        {
            return Err(LlmError::network("connection reset"));
        }
        base(call)
    }));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1", "k2"]));

    let (observer, rx) = ChannelObserver::new();
    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &observer, &CancelSignal::new())
        .await;

    assert_eq!(headings(&run), vec!["A"]);
    let RunStatus::Failed { stage, error } = &run.status else {
        panic!("expected failure, got {}", run.status);
    };
    assert_eq!(*stage, RunState::GeneratingContent { index: 1 });
    let Error::ContentGenerationFailed { heading, source } = error else {
        panic!("expected ContentGenerationFailed, got {error:?}");
    };
    assert_eq!(heading, "B");
    assert!(matches!(**source, Error::RequestFailed(_)));

    // Non-quota errors never rotate, and C is never attempted.
    assert_eq!(model.credentials_used().await, vec!["k1"; 4]);
    assert!(
        model
            .calls()
            .await
            .iter()
            .all(|c| !c.request.prompt.contains("Write the section \"C\""))
    );

    let events = drain(rx);
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Failed { stage: RunState::GeneratingContent { index: 1 }, .. })
    ));
}

#[tokio::test]
async fn test_invalid_outline_fails_run() {
    let model = Arc::new(MockModel::new(scripted("Sure! Here are some ideas.", false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.sections.is_empty());
    assert!(matches!(
        run.status,
        RunStatus::Failed {
            stage: RunState::GeneratingOutline,
            error: Error::InvalidOutline(_)
        }
    ));
    assert_eq!(model.call_count().await, 2);
}

#[tokio::test]
async fn test_invalid_request_makes_no_calls() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(0), &(), &CancelSignal::new())
        .await;

    assert!(matches!(
        run.status,
        RunStatus::Failed {
            stage: RunState::Idle,
            error: Error::InvalidRequest(_)
        }
    ));
    assert_eq!(model.call_count().await, 0);
}

// ============================================================================
// Key rotation through the pipeline
// ============================================================================

#[tokio::test]
async fn test_quota_rotation_persists_across_stages() {
    let base = scripted(OUTLINE, false);
    let model = Arc::new(MockModel::new(move |call| {
        if call.credential == "k1" {
            return Err(LlmError::rate_limited("mock", "RESOURCE_EXHAUSTED"));
        }
        base(call)
    }));
    let invoker = invoker(&model, &["k1", "k2", "k3"]);
    let pool = invoker.pool().clone();
    let pipeline = TutorialPipeline::new(invoker);

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.status.is_complete());
    // One rejected attempt on k1, then every call stays on k2.
    assert_eq!(
        model.credentials_used().await,
        vec!["k1", "k2", "k2", "k2", "k2", "k2"]
    );
    assert_eq!(pool.position().await, 1);
}

#[tokio::test]
async fn test_all_keys_exhausted_fails_first_stage() {
    let model = Arc::new(MockModel::new(|_| {
        Err(LlmError::rate_limited("mock", "quota exceeded"))
    }));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1", "k2", "k3"]));

    let run = pipeline
        .run(TutorialRequest::new("Rust"), &(), &CancelSignal::new())
        .await;

    assert!(matches!(
        run.status,
        RunStatus::Failed {
            stage: RunState::AnalyzingTopic,
            error: Error::AllKeysExhausted { attempts: 3 }
        }
    ));
    assert_eq!(model.credentials_used().await, vec!["k1", "k2", "k3"]);
}

// ============================================================================
// Topic analysis policy
// ============================================================================

#[tokio::test]
async fn test_force_search_marks_every_entry() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, true)));
    let invoker = invoker(&model, &["k1"]);
    let search = Arc::new(MockSearch::returning("primary", results(1)));
    let resolver = SearchResolver::new(invoker.clone()).shared_strategy(search.clone());
    let pipeline = TutorialPipeline::new(invoker)
        .with_resolver(resolver)
        .with_config(PipelineConfig::default().with_time_sensitivity(TimeSensitivity::ForceSearch));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.status.is_complete());
    assert!(run.outline.iter().all(|e| e.requires_search));
    assert_eq!(search.queries().await, vec!["Rust A", "Rust B", "Rust C"]);

    let calls = model.calls().await;
    let outline_call = calls
        .iter()
        .find(|c| c.request.agent == AgentRole::OutlinePlanner)
        .unwrap();
    assert!(outline_call.request.prompt.contains("EVERY heading"));
}

#[tokio::test]
async fn test_advisory_policy_keeps_planner_marks() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, true)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert_eq!(
        run.outline.iter().map(|e| e.requires_search).collect::<Vec<_>>(),
        vec![false, true, false]
    );
}

#[tokio::test]
async fn test_analysis_can_be_disabled() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]))
        .with_config(PipelineConfig::default().with_analysis(false));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.status.is_complete());
    let calls = model.calls().await;
    assert!(calls.iter().all(|c| c.request.agent != AgentRole::TopicAnalyst));
    assert_eq!(calls[0].request.agent, AgentRole::OutlinePlanner);
}

#[tokio::test]
async fn test_unreadable_analysis_is_not_time_sensitive() {
    let base = scripted(OUTLINE, false);
    let model = Arc::new(MockModel::new(move |call| {
        if call.request.agent == AgentRole::TopicAnalyst {
            return Ok("I think so".to_owned());
        }
        base(call)
    }));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;

    assert!(run.status.is_complete());
    let calls = model.calls().await;
    assert!(calls[1].request.prompt.contains("only to headings"));
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cancels the run as soon as the first section is recorded.
struct CancelAfterFirst {
    cancel: CancelSignal,
}

impl PipelineObserver for CancelAfterFirst {
    async fn on_section(&self, _index: usize, _artifact: &SectionArtifact) {
        self.cancel.cancel_with_reason("stop requested");
    }
}

#[tokio::test]
async fn test_cancel_keeps_recorded_sections() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));
    let cancel = CancelSignal::new();
    let observer = CancelAfterFirst {
        cancel: cancel.clone(),
    };

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &observer, &cancel)
        .await;

    assert_eq!(headings(&run), vec!["A"]);
    let Some(Error::Cancelled { reason }) = run.status.error() else {
        panic!("expected cancellation, got {}", run.status);
    };
    assert_eq!(reason.as_deref(), Some("stop requested"));
}

/// Cancels while the second section is being written.
struct CancelWhileWritingSecond {
    cancel: CancelSignal,
}

impl PipelineObserver for CancelWhileWritingSecond {
    async fn on_activity(&self, activity: &str) {
        if activity.starts_with("Writing section 2/") {
            self.cancel.cancel_with_reason("ctrl-c");
        }
    }
}

#[tokio::test]
async fn test_cancel_during_content_keeps_written_section() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));
    let cancel = CancelSignal::new();
    let observer = CancelWhileWritingSecond {
        cancel: cancel.clone(),
    };

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &observer, &cancel)
        .await;

    assert_eq!(headings(&run), vec!["A", "B"]);
    assert_eq!(run.sections[1].markdown_body, "Body of B.");
    let Some(Error::Cancelled { reason }) = run.status.error() else {
        panic!("expected cancellation, got {}", run.status);
    };
    assert_eq!(reason.as_deref(), Some("ctrl-c"));

    let writes = model
        .calls()
        .await
        .iter()
        .filter(|c| c.request.agent == AgentRole::ContentWriter)
        .count();
    assert_eq!(writes, 2);
}

#[tokio::test]
async fn test_cancel_before_start_makes_no_calls() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));
    let cancel = CancelSignal::new();
    cancel.cancel();

    let run = pipeline
        .run(TutorialRequest::new("Rust"), &(), &cancel)
        .await;

    assert!(matches!(run.status.error(), Some(Error::Cancelled { reason: None })));
    assert_eq!(model.call_count().await, 0);
}

// ============================================================================
// Simplifier
// ============================================================================

#[tokio::test]
async fn test_simplify_recorded_section() {
    let model = Arc::new(MockModel::new(scripted(OUTLINE, false)));
    let pipeline = TutorialPipeline::new(invoker(&model, &["k1"]));

    let run = pipeline
        .run(TutorialRequest::new("Rust").sections(3), &(), &CancelSignal::new())
        .await;
    let simplified = pipeline.simplify(&run.sections[0], "English").await.unwrap();

    assert_eq!(simplified.heading, run.sections[0].heading);
    assert_eq!(simplified.markdown_body, "Simpler body.");
    assert_eq!(run.sections[0].markdown_body, "Body of A.");
}
