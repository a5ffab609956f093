//! Model request types and the provider trait.
//!
//! This module provides:
//! - [`GenerateRequest`]: a single templated prompt plus sampling options
//! - [`ModelResponse`]: the text the model produced
//! - [`ModelProvider`]: the language-model collaborator every agent call goes through
//!
//! Providers never own a credential. The invoker hands one in per attempt so
//! that key rotation stays visible at the call site.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::keys::Credential;
use crate::llms::LlmError;

/// The agent a request is issued on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Classifies whether a topic is time-sensitive.
    TopicAnalyst,
    /// Plans the ordered list of section headings.
    OutlinePlanner,
    /// Writes the markdown body of one section.
    ContentWriter,
    /// Condenses search evidence into a context blob.
    SearchSummarizer,
    /// Rewrites a finished section in plainer language.
    Simplifier,
}

impl AgentRole {
    /// Returns the snake-case name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TopicAnalyst => "topic_analyst",
            Self::OutlinePlanner => "outline_planner",
            Self::ContentWriter => "content_writer",
            Self::SearchSummarizer => "search_summarizer",
            Self::Simplifier => "simplifier",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Agent issuing the request.
    pub agent: AgentRole,
    /// Optional system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// The user prompt.
    pub prompt: String,
    /// Ask the provider for a JSON object response.
    #[serde(default)]
    pub json_mode: bool,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerateRequest {
    /// Default sampling temperature.
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Creates a plain-text request.
    #[must_use]
    pub fn new(agent: AgentRole, prompt: impl Into<String>) -> Self {
        Self {
            agent,
            system: None,
            prompt: prompt.into(),
            json_mode: false,
            temperature: Self::DEFAULT_TEMPERATURE,
        }
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Requests a JSON response.
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Sets temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// The text produced by one model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Generated text.
    pub text: String,
    /// Model that served the request, when the provider reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ModelResponse {
    /// Creates a response from text only.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }
}

/// Core trait for language model backends.
///
/// Implementations must map a quota or rate-limit rejection to
/// [`LlmError::RateLimited`] so the invoker can rotate credentials.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Execute `request` authenticated with `credential`.
    async fn generate(
        &self,
        credential: &Credential,
        request: &GenerateRequest,
    ) -> Result<ModelResponse, LlmError>;

    /// Get the name of this provider.
    ///
    /// Used for error messages and logging.
    fn provider_name(&self) -> &'static str;
}

/// Type alias for an Arc-wrapped provider.
pub type SharedModelProvider = Arc<dyn ModelProvider>;
