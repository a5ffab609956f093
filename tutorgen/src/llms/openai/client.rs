//! OpenAI-compatible API client implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::Result;
use crate::keys::Credential;
use crate::llms::LlmError;
use crate::model::{GenerateRequest, ModelProvider, ModelResponse};

use super::config::OpenAIConfig;
use super::types::{
    OpenAIChatRequest, OpenAIChatResponse, OpenAIErrorBody, OpenAIMessage, OpenAIResponseFormat,
};

const PROVIDER: &str = "openai";

/// OpenAI-compatible API client.
#[derive(Debug, Clone)]
pub struct OpenAI {
    pub(crate) config: Arc<OpenAIConfig>,
    pub(crate) client: Client,
}

impl OpenAI {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Build the chat completions URL.
    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Build an authenticated JSON request.
    pub(crate) fn build_request(&self, url: &str, credential: &Credential) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .header("Content-Type", "application/json");

        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        req
    }

    /// Build the request body.
    pub(crate) fn build_body(&self, request: &GenerateRequest) -> OpenAIChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_owned(),
                content: system.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user".to_owned(),
            content: request.prompt.clone(),
        });

        OpenAIChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: Some(request.temperature),
            response_format: request.json_mode.then_some(OpenAIResponseFormat::JsonObject),
        }
    }

    /// Extract the generated text from a parsed response.
    pub(crate) fn parse_response(response: OpenAIChatResponse) -> std::result::Result<ModelResponse, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::response_format("at least one choice", "empty choices"))?;

        match (choice.message.content, choice.message.refusal) {
            (Some(text), _) if !text.trim().is_empty() => Ok(ModelResponse {
                text,
                model: response.model,
            }),
            (_, Some(refusal)) => Err(LlmError::provider_code(PROVIDER, "refusal", refusal)),
            _ => Err(LlmError::response_format(
                "message content",
                format!(
                    "empty content (finish_reason: {})",
                    choice.finish_reason.as_deref().unwrap_or("unknown")
                ),
            )),
        }
    }

    /// Classify an error response.
    ///
    /// HTTP 429, or any body that mentions `RESOURCE_EXHAUSTED` or a quota,
    /// becomes [`LlmError::RateLimited`].
    pub(crate) fn parse_error(status: u16, body: &str) -> LlmError {
        let parsed = serde_json::from_str::<OpenAIErrorBody>(body)
            .ok()
            .and_then(OpenAIErrorBody::into_error);

        let Some(error) = parsed else {
            if status == 429 || mentions_quota(body) {
                return LlmError::rate_limited(PROVIDER, body.to_owned());
            }
            return LlmError::http_status(status, body.to_owned());
        };

        let code = error.code_string();
        let quota = status == 429
            || mentions_quota(&error.message)
            || code.as_deref().is_some_and(mentions_quota);

        if quota {
            return LlmError::rate_limited(PROVIDER, error.message);
        }

        match status {
            401 | 403 => LlmError::auth(PROVIDER, error.message),
            _ => LlmError::provider_code(PROVIDER, code.unwrap_or_else(|| status.to_string()), error.message),
        }
    }
}

fn mentions_quota(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("resource_exhausted") || lower.contains("quota")
}

#[async_trait]
impl ModelProvider for OpenAI {
    async fn generate(
        &self,
        credential: &Credential,
        request: &GenerateRequest,
    ) -> std::result::Result<ModelResponse, LlmError> {
        let url = self.chat_url();
        let body = self.build_body(request);
        debug!(agent = %request.agent, model = %body.model, "sending chat completion request");

        let response = self.build_request(&url, credential).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &error_text));
        }

        let response_text = response.text().await?;
        let parsed: OpenAIChatResponse = serde_json::from_str(&response_text).map_err(|e| {
            LlmError::response_format(
                "valid chat completion response",
                format!("parse error: {e}, response: {response_text}"),
            )
        })?;

        Self::parse_response(parsed)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
