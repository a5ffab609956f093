//! Unified error types for tutorial generation.
//!
//! This module provides the error hierarchy covering:
//! - credential rotation outcomes (quota exhaustion, hard request failures)
//! - search resolution failures
//! - outline and content generation failures
//! - configuration and cancellation

pub use crate::llms::LlmError;
pub use crate::search::SearchError;

/// Result type alias for tutorgen operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for tutorgen.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Every credential in the pool was rejected for quota reasons.
    #[error("All {attempts} API keys exhausted their quota")]
    AllKeysExhausted {
        /// Number of attempts made, one per credential.
        attempts: usize,
    },

    /// The model call failed for a reason other than quota.
    #[error("Model request failed: {0}")]
    RequestFailed(#[source] LlmError),

    /// No search strategy produced a usable answer.
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    /// The outline response could not be parsed into headings.
    #[error("Invalid outline: {0}")]
    InvalidOutline(String),

    /// Content generation for one section failed.
    #[error("Content generation failed for '{heading}': {source}")]
    ContentGenerationFailed {
        /// Heading of the section being written.
        heading: String,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tutorial request itself is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The run was cancelled by the caller.
    #[error("Run cancelled{}", cancel_suffix(.reason.as_deref()))]
    Cancelled {
        /// Optional cancellation reason.
        reason: Option<String>,
    },

    /// Provider error outside of an invocation (e.g. client construction).
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid outline error.
    #[must_use]
    pub fn invalid_outline(msg: impl Into<String>) -> Self {
        Self::InvalidOutline(msg.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Wrap a failure that happened while writing `heading`.
    #[must_use]
    pub fn content_failed(heading: impl Into<String>, source: Self) -> Self {
        Self::ContentGenerationFailed {
            heading: heading.into(),
            source: Box::new(source),
        }
    }

    /// Whether the pipeline may absorb this error and keep going.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::SearchUnavailable(_))
    }
}

fn cancel_suffix(reason: Option<&str>) -> String {
    reason.map(|r| format!(": {r}")).unwrap_or_default()
}

impl From<SearchError> for Error {
    fn from(err: SearchError) -> Self {
        Self::SearchUnavailable(err.to_string())
    }
}
