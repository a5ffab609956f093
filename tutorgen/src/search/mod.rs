//! Web search with an ordered fallback chain and evidence summarization.
//!
//! # Architecture
//!
//! - [`SearchProvider`]: one strategy for turning a query into results
//! - [`DuckDuckGoLite`]: primary strategy, scrapes the lite HTML page
//! - [`SerperSearch`]: fallback strategy, calls the Serper JSON API
//! - [`SearchResolver`]: tries strategies in order, then summarizes the
//!   evidence through the [`Invoker`]

mod duckduckgo;
mod html;
mod serper;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::invoker::Invoker;
use crate::prompts;

pub use duckduckgo::DuckDuckGoLite;
pub use serper::SerperSearch;

/// Hard cap on results kept from any provider.
pub const MAX_RESULTS: usize = 8;

/// Default timeout for a single search fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Browser user agent sent to search endpoints.
pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Title of the result.
    pub title: String,
    /// URL of the result.
    pub link: String,
    /// Description/snippet of the result.
    pub snippet: String,
}

impl SearchResult {
    /// Creates a result.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: snippet.into(),
        }
    }
}

/// Failure of a single search strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SearchError {
    /// The provider could not be reached or answered with an error.
    #[error("[{provider}] unavailable: {message}")]
    Unavailable {
        /// Strategy name.
        provider: &'static str,
        /// Error description.
        message: String,
    },

    /// The provider did not answer within the fetch timeout.
    #[error("[{provider}] timed out")]
    Timeout {
        /// Strategy name.
        provider: &'static str,
    },
}

impl SearchError {
    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider,
            message: message.into(),
        }
    }

    /// Map a transport error, separating timeouts.
    pub(crate) fn from_reqwest(provider: &'static str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::unavailable(provider, err.to_string())
        }
    }
}

/// One search strategy.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Strategy name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Run `query`. An empty vector means the provider answered with nothing.
    async fn search(&self, query: &str) -> std::result::Result<Vec<SearchResult>, SearchError>;
}

/// Summarized evidence plus the results it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSearch {
    /// Summary to feed into content generation.
    pub context: String,
    /// Results the summary was built from.
    pub sources: Vec<SearchResult>,
}

impl ResolvedSearch {
    /// Context reported when search succeeded but found nothing.
    pub const EMPTY_CONTEXT: &'static str = "no information found";

    /// The explicit empty result.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            context: Self::EMPTY_CONTEXT.to_owned(),
            sources: Vec::new(),
        }
    }

    /// Whether no sources were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Search resolver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    /// Results kept per query, clamped to [`MAX_RESULTS`].
    pub max_results: usize,
    /// Temperature for the evidence summary.
    pub summary_temperature: f32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS,
            summary_temperature: 0.2,
        }
    }
}

/// Tries search strategies in order and summarizes the first usable answer.
///
/// Resolution rules:
/// - the first strategy returning at least one result wins;
/// - a strategy answering with zero results, or failing, passes to the next;
/// - if a fallback strategy (any after the first) answered with zero results
///   and nothing produced results, the outcome is [`ResolvedSearch::empty`];
/// - otherwise resolution fails with [`Error::SearchUnavailable`].
pub struct SearchResolver {
    strategies: Vec<Arc<dyn SearchProvider>>,
    invoker: Invoker,
    config: ResolverConfig,
}

impl std::fmt::Debug for SearchResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("SearchResolver")
            .field("strategies", &names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SearchResolver {
    /// Creates a resolver with no strategies.
    #[must_use]
    pub fn new(invoker: Invoker) -> Self {
        Self {
            strategies: Vec::new(),
            invoker,
            config: ResolverConfig::default(),
        }
    }

    /// Standard chain: DuckDuckGo Lite, then Serper when a key is given.
    ///
    /// # Errors
    ///
    /// Fails when an HTTP client cannot be built.
    pub fn standard(
        invoker: Invoker,
        serper_api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut resolver = Self::new(invoker).strategy(DuckDuckGoLite::new(timeout)?);
        if let Some(key) = serper_api_key.filter(|k| !k.trim().is_empty()) {
            resolver = resolver.strategy(SerperSearch::new(key, timeout)?);
        }
        Ok(resolver)
    }

    /// Appends a strategy to the chain.
    #[must_use]
    pub fn strategy<S: SearchProvider + 'static>(self, strategy: S) -> Self {
        self.shared_strategy(Arc::new(strategy))
    }

    /// Appends an already shared strategy to the chain.
    #[must_use]
    pub fn shared_strategy(mut self, strategy: Arc<dyn SearchProvider>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Sets resolver options.
    #[must_use]
    pub const fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Names of the configured strategies, in order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    fn max_results(&self) -> usize {
        self.config.max_results.clamp(1, MAX_RESULTS)
    }

    /// Resolve `query` into a summary and its sources.
    ///
    /// # Errors
    ///
    /// [`Error::SearchUnavailable`] when no strategy produced an answer;
    /// invoker errors from the summary call propagate unchanged.
    pub async fn resolve(&self, query: &str) -> Result<ResolvedSearch> {
        let sources = self.gather(query).await?;
        if sources.is_empty() {
            info!(query, "search found nothing");
            return Ok(ResolvedSearch::empty());
        }

        let evidence = prompts::format_evidence(&sources);
        let request = prompts::search_summary(query, &evidence)
            .temperature(self.config.summary_temperature);
        let response = self.invoker.invoke_request(request).await?;

        Ok(ResolvedSearch {
            context: response.text.trim().to_owned(),
            sources,
        })
    }

    /// Run the strategy chain without summarizing.
    ///
    /// # Errors
    ///
    /// [`Error::SearchUnavailable`] per the resolution rules above.
    pub async fn gather(&self, query: &str) -> Result<Vec<SearchResult>> {
        if self.strategies.is_empty() {
            return Err(Error::SearchUnavailable(
                "no search providers configured".to_owned(),
            ));
        }

        let mut failures = Vec::new();
        let mut fallback_answered_empty = false;

        for (position, strategy) in self.strategies.iter().enumerate() {
            match strategy.search(query).await {
                Ok(mut results) if !results.is_empty() => {
                    results.truncate(self.max_results());
                    debug!(
                        provider = strategy.name(),
                        count = results.len(),
                        "search succeeded"
                    );
                    return Ok(results);
                }
                Ok(_) => {
                    debug!(provider = strategy.name(), "search returned no results");
                    if position > 0 {
                        fallback_answered_empty = true;
                    }
                    failures.push(format!("[{}] no results", strategy.name()));
                }
                Err(err) => {
                    warn!(provider = strategy.name(), error = %err, "search strategy failed");
                    failures.push(err.to_string());
                }
            }
        }

        if fallback_answered_empty {
            return Ok(Vec::new());
        }
        Err(Error::SearchUnavailable(failures.join("; ")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::keys::KeyPool;
    use crate::mock::{MockModel, MockSearch};
    use crate::model::{AgentRole, SharedModelProvider};

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult::new(format!("T{i}"), format!("https://e.com/{i}"), format!("S{i}")))
            .collect()
    }

    fn setup() -> (Arc<MockModel>, Invoker) {
        let model = Arc::new(MockModel::new(|_| Ok("summary".into())));
        let pool = Arc::new(KeyPool::new(["k"]).unwrap());
        let invoker = Invoker::new(pool, Arc::clone(&model) as SharedModelProvider);
        (model, invoker)
    }

    #[tokio::test]
    async fn primary_results_are_summarized() {
        let (model, invoker) = setup();
        let primary = Arc::new(MockSearch::returning("primary", results(3)));
        let fallback = Arc::new(MockSearch::returning("fallback", results(1)));
        let resolver = SearchResolver::new(invoker)
            .shared_strategy(Arc::clone(&primary) as Arc<dyn SearchProvider>)
            .shared_strategy(Arc::clone(&fallback) as Arc<dyn SearchProvider>);

        let resolved = resolver.resolve("rust async").await.unwrap();
        assert_eq!(resolved.context, "summary");
        assert_eq!(resolved.sources.len(), 3);
        assert!(fallback.queries().await.is_empty(), "fallback not consulted");

        let calls = model.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].request.agent, AgentRole::SearchSummarizer);
        assert!(calls[0].request.prompt.contains("T0"));
        assert!(calls[0].request.prompt.contains("S2"));
    }

    #[tokio::test]
    async fn results_are_capped_at_eight() {
        let (_, invoker) = setup();
        let resolver = SearchResolver::new(invoker)
            .strategy(MockSearch::returning("primary", results(25)))
            .with_config(ResolverConfig {
                max_results: 50,
                ..ResolverConfig::default()
            });

        let resolved = resolver.resolve("q").await.unwrap();
        assert_eq!(resolved.sources.len(), MAX_RESULTS);
        assert_eq!(resolved.sources[0].title, "T0");
    }

    #[tokio::test]
    async fn failed_primary_falls_back() {
        let (_, invoker) = setup();
        let resolver = SearchResolver::new(invoker)
            .strategy(MockSearch::failing(
                "primary",
                SearchError::Timeout { provider: "primary" },
            ))
            .strategy(MockSearch::returning("fallback", results(2)));

        let resolved = resolver.resolve("q").await.unwrap();
        assert_eq!(resolved.sources.len(), 2);
    }

    #[tokio::test]
    async fn empty_primary_without_fallback_is_unavailable() {
        let (model, invoker) = setup();
        let resolver =
            SearchResolver::new(invoker).strategy(MockSearch::returning("primary", Vec::new()));

        let err = resolver.resolve("q").await.unwrap_err();
        assert!(matches!(err, Error::SearchUnavailable(_)));
        assert_eq!(model.call_count().await, 0);
    }

    #[tokio::test]
    async fn both_empty_is_explicit_empty_result() {
        let (model, invoker) = setup();
        let resolver = SearchResolver::new(invoker)
            .strategy(MockSearch::returning("primary", Vec::new()))
            .strategy(MockSearch::returning("fallback", Vec::new()));

        let resolved = resolver.resolve("q").await.unwrap();
        assert_eq!(resolved, ResolvedSearch::empty());
        assert_eq!(resolved.context, "no information found");
        assert_eq!(model.call_count().await, 0, "nothing to summarize");
    }

    #[tokio::test]
    async fn both_failing_is_unavailable() {
        let (_, invoker) = setup();
        let resolver = SearchResolver::new(invoker)
            .strategy(MockSearch::failing("primary", SearchError::unavailable("primary", "503")))
            .strategy(MockSearch::failing("fallback", SearchError::unavailable("fallback", "401")));

        let Error::SearchUnavailable(msg) = resolver.resolve("q").await.unwrap_err() else {
            panic!("expected SearchUnavailable");
        };
        assert!(msg.contains("primary"));
        assert!(msg.contains("fallback"));
    }

    #[tokio::test]
    async fn no_strategies_is_unavailable() {
        let (_, invoker) = setup();
        let resolver = SearchResolver::new(invoker);
        assert!(matches!(
            resolver.resolve("q").await,
            Err(Error::SearchUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn standard_chain_adds_serper_only_with_key() {
        let (_, invoker) = setup();
        let without = SearchResolver::standard(invoker.clone(), None, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(without.strategy_names(), vec!["duckduckgo"]);

        let with =
            SearchResolver::standard(invoker, Some("serper-key".into()), DEFAULT_TIMEOUT).unwrap();
        assert_eq!(with.strategy_names(), vec!["duckduckgo", "serper"]);
    }
}
