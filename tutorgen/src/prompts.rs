//! Prompt templates for each agent role.
//!
//! Every builder returns a ready [`GenerateRequest`] tagged with its
//! [`AgentRole`], so the invoker and test doubles can tell calls apart.

use std::fmt::Write as _;

use crate::model::{AgentRole, GenerateRequest};
use crate::outline::{OutlineEntry, SEARCH_MARKER};
use crate::pipeline::{PipelineContext, SectionArtifact};
use crate::search::SearchResult;

const ANALYST_SYSTEM: &str = "You classify tutorial topics. Answer with a JSON object only.";

const PLANNER_SYSTEM: &str = "You are an expert curriculum designer. You plan tutorials as an \
ordered list of section headings and answer with JSON only.";

const WRITER_SYSTEM: &str = "You are an expert technical writer producing one section of a \
markdown tutorial at a time. Write clear, accurate, well-structured markdown.";

const SUMMARIZER_SYSTEM: &str = "You condense web search evidence into a factual brief. Use only \
the evidence you are given. Never add facts from memory.";

const SIMPLIFIER_SYSTEM: &str = "You rewrite tutorial sections for complete beginners while \
keeping every fact intact.";

/// Ask whether `topic` depends on recent or changing information.
///
/// The model answers `{"time_sensitive": bool}`.
#[must_use]
pub fn topic_analysis(topic: &str) -> GenerateRequest {
    let prompt = format!(
        "Topic: \"{topic}\"\n\n\
         Decide whether an accurate tutorial on this topic depends on recent events, \
         current versions, prices, releases, statistics or other information that changes \
         over time.\n\n\
         Respond with exactly this JSON shape: {{\"time_sensitive\": true}} or \
         {{\"time_sensitive\": false}}"
    );
    GenerateRequest::new(AgentRole::TopicAnalyst, prompt)
        .system(ANALYST_SYSTEM)
        .json()
        .temperature(0.0)
}

/// Ask for exactly `num_sections` headings.
///
/// A time-sensitive topic asks the planner to mark every heading; otherwise
/// only headings that need current facts are marked.
#[must_use]
pub fn outline(ctx: &PipelineContext, num_sections: usize, time_sensitive: bool) -> GenerateRequest {
    let marking = if time_sensitive {
        format!(
            "This topic depends on current information. Append the token {SEARCH_MARKER} \
             to EVERY heading."
        )
    } else {
        format!(
            "Append the token {SEARCH_MARKER} only to headings whose content depends on \
             recent or changing facts (versions, releases, prices, news). Leave all other \
             headings unmarked."
        )
    };

    let prompt = format!(
        "Plan a tutorial.\n\n\
         Topic: {topic}\n\
         Audience: {audience}\n\
         Language: {language}\n\n\
         Produce exactly {num_sections} section headings in teaching order, written in \
         {language}. Headings are short titles, without numbering or markdown.\n\
         {marking}\n\n\
         Respond with a JSON array of strings only, for example:\n\
         [\"Introduction\", \"Latest release {SEARCH_MARKER}\"]",
        topic = ctx.topic,
        audience = ctx.audience,
        language = ctx.language,
    );

    GenerateRequest::new(AgentRole::OutlinePlanner, prompt)
        .system(PLANNER_SYSTEM)
        .json()
}

/// Ask for the markdown body of `entry`.
#[must_use]
pub fn content(
    ctx: &PipelineContext,
    entry: &OutlineEntry,
    search_context: Option<&str>,
) -> GenerateRequest {
    let mut prompt = format!(
        "Tutorial topic: {topic}\n\
         Audience: {audience}\n\
         Language: {language}\n\n\
         Full outline:\n",
        topic = ctx.topic,
        audience = ctx.audience,
        language = ctx.language,
    );

    for (i, heading) in ctx.headings().enumerate() {
        let marker = if heading == entry.heading { "  <- current" } else { "" };
        let _ = writeln!(prompt, "{}. {heading}{marker}", i + 1);
    }

    match ctx.previous_summary() {
        Some(summary) => {
            let _ = write!(prompt, "\nThe previous section covered:\n{summary}\n");
        }
        None => prompt.push_str("\nThis is the first section of the tutorial.\n"),
    }

    if let Some(context) = search_context {
        let _ = write!(
            prompt,
            "\nResearch notes from a web search (prefer these over memory for current \
             facts):\n{context}\n"
        );
    }

    let _ = write!(
        prompt,
        "\nWrite the section \"{heading}\" in {language}. Build on the previous section \
         without repeating it and do not cover other headings. Use markdown with \
         subheadings, lists and code blocks where helpful. Do not repeat the section \
         heading at the top.",
        heading = entry.heading,
        language = ctx.language,
    );

    GenerateRequest::new(AgentRole::ContentWriter, prompt).system(WRITER_SYSTEM)
}

/// Number results as `[i] title` lines followed by their snippet.
#[must_use]
pub fn format_evidence(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if r.snippet.is_empty() {
                format!("[{}] {}\n{}", i + 1, r.title, r.link)
            } else {
                format!("[{}] {}\n{}\n{}", i + 1, r.title, r.link, r.snippet)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Summarize `evidence` for `query`, using nothing but the evidence.
#[must_use]
pub fn search_summary(query: &str, evidence: &str) -> GenerateRequest {
    let prompt = format!(
        "Search query: {query}\n\n\
         Evidence:\n{evidence}\n\n\
         Summarize only from the given evidence. Keep names, versions, dates and numbers \
         exactly as written. If the evidence does not answer the query, say so."
    );
    GenerateRequest::new(AgentRole::SearchSummarizer, prompt).system(SUMMARIZER_SYSTEM)
}

/// Search query for one section.
#[must_use]
pub fn search_query(topic: &str, heading: &str) -> String {
    format!("{topic} {heading}")
}

/// Rewrite `artifact` in plainer language.
#[must_use]
pub fn simplify(artifact: &SectionArtifact, language: &str) -> GenerateRequest {
    let prompt = format!(
        "Rewrite the tutorial section below for a complete beginner, in {language}.\n\
         Use short sentences and everyday words, explain every technical term the first \
         time it appears, and keep all code blocks and facts unchanged. Return markdown \
         only, without the section heading.\n\n\
         Section: {heading}\n\n{body}",
        heading = artifact.heading,
        body = artifact.markdown_body,
    );
    GenerateRequest::new(AgentRole::Simplifier, prompt).system(SIMPLIFIER_SYSTEM)
}
