//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use tutorgen::llms::OpenAIConfig;
use tutorgen::pipeline::{PipelineConfig, TimeSensitivity, TutorialRequest};
use tutorgen::search::{MAX_RESULTS, ResolverConfig};

use super::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TutorConfig {
    /// Language model settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Generation defaults.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// Language model settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API keys, tried in order when one runs out of quota.
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    OpenAIConfig::DEFAULT_MODEL.to_owned()
}

fn default_base_url() -> String {
    OpenAIConfig::DEFAULT_BASE_URL.to_owned()
}

const fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Turn per-section web search on or off.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Serper API key for the fallback provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serper_api_key: Option<String>,

    /// Per-fetch timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Results kept per query.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_search_timeout() -> u64 {
    5
}

const fn default_max_results() -> usize {
    MAX_RESULTS
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            serper_api_key: None,
            timeout_secs: default_search_timeout(),
            max_results: default_max_results(),
        }
    }
}

impl SearchConfig {
    /// Resolver options for these settings.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_results: self.max_results,
            ..ResolverConfig::default()
        }
    }
}

/// Generation defaults, overridable per command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Classify topics for time-sensitivity before planning.
    #[serde(default = "default_true")]
    pub analyze_topic: bool,

    /// How a time-sensitive topic is handled.
    #[serde(default)]
    pub time_sensitivity: TimeSensitivity,

    /// Default number of sections.
    #[serde(default = "default_sections")]
    pub sections: usize,

    /// Default audience.
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Default output language.
    #[serde(default = "default_language")]
    pub language: String,
}

const fn default_sections() -> usize {
    TutorialRequest::DEFAULT_SECTIONS
}

fn default_audience() -> String {
    TutorialRequest::DEFAULT_AUDIENCE.to_owned()
}

fn default_language() -> String {
    TutorialRequest::DEFAULT_LANGUAGE.to_owned()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            analyze_topic: true,
            time_sensitivity: TimeSensitivity::default(),
            sections: default_sections(),
            audience: default_audience(),
            language: default_language(),
        }
    }
}

impl PipelineSettings {
    /// Pipeline options for these settings.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_analysis(self.analyze_topic)
            .with_time_sensitivity(self.time_sensitivity)
    }
}

impl TutorConfig {
    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// `TUTORGEN_API_KEYS` is a comma-separated list and replaces the
    /// configured keys. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(keys) = var("TUTORGEN_API_KEYS") {
            self.llm.api_keys = split_keys(&keys);
        }
        if let Some(key) = var("SERPER_API_KEY") {
            self.search.serper_api_key = Some(key.trim().to_owned());
        }
        if let Some(model) = var("TUTORGEN_MODEL") {
            self.llm.model = model.trim().to_owned();
        }
        if let Some(url) = var("TUTORGEN_BASE_URL") {
            self.llm.base_url = url.trim().to_owned();
        }
    }

    /// Configured API keys with blanks removed.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingField`] when no key is left.
    pub fn api_keys(&self) -> ConfigResult<Vec<String>> {
        let keys: Vec<String> = self
            .llm
            .api_keys
            .iter()
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(ConfigError::MissingField(
                "llm.api_keys (or TUTORGEN_API_KEYS)".to_owned(),
            ));
        }
        Ok(keys)
    }

    /// Model client settings.
    #[must_use]
    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfig::new(&self.llm.model)
            .with_base_url(&self.llm.base_url)
            .with_timeout(self.llm.timeout_secs)
    }

    /// Checks values that would otherwise fail deep inside a run.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for the first bad value found.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pipeline.sections == 0 {
            return Err(ConfigError::InvalidValue(
                "pipeline.sections must be at least 1".to_owned(),
            ));
        }
        if self.search.max_results == 0 || self.search.max_results > MAX_RESULTS {
            return Err(ConfigError::InvalidValue(format!(
                "search.max_results must be between 1 and {MAX_RESULTS}"
            )));
        }
        if self.search.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeouts must be at least 1 second".to_owned(),
            ));
        }
        Ok(())
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect()
}
