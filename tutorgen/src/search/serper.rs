//! Fallback search strategy: the Serper Google Search JSON API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{MAX_RESULTS, SearchError, SearchProvider, SearchResult};

const NAME: &str = "serper";
const ENDPOINT: &str = "https://google.serper.dev/search";

/// Serper API client.
#[derive(Clone)]
pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_results: usize,
}

impl std::fmt::Debug for SerperSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperSearch")
            .field("endpoint", &self.endpoint)
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

impl SerperSearch {
    /// Create a client for `api_key` whose calls time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::unavailable(NAME, e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: ENDPOINT.to_owned(),
            max_results: MAX_RESULTS,
        })
    }

    /// Override the endpoint (self-hosted proxies).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set maximum results, clamped to [`MAX_RESULTS`].
    #[must_use]
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.min(MAX_RESULTS);
        self
    }

    /// Parse a Serper response body, skipping entries without a title or link.
    pub(crate) fn parse_results(body: &str, max: usize) -> Result<Vec<SearchResult>, SearchError> {
        let parsed: SerperResponse = serde_json::from_str(body)
            .map_err(|e| SearchError::unavailable(NAME, format!("invalid response: {e}")))?;

        Ok(parsed
            .organic
            .into_iter()
            .filter_map(|item| {
                let title = item.title.filter(|t| !t.trim().is_empty())?;
                let link = item.link.filter(|l| !l.trim().is_empty())?;
                Some(SearchResult {
                    title,
                    link,
                    snippet: item.snippet.unwrap_or_default(),
                })
            })
            .take(max)
            .collect())
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest {
                q: query,
                num: self.max_results,
            })
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(NAME, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::from_reqwest(NAME, &e))?;

        if !status.is_success() {
            return Err(SearchError::unavailable(NAME, format!("HTTP {status}: {body}")));
        }

        Self::parse_results(&body, self.max_results)
    }
}
