//! Primary search strategy: scrape DuckDuckGo's lite HTML results page.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{MAX_RESULTS, SearchError, SearchProvider, SearchResult, USER_AGENT, html};

const NAME: &str = "duckduckgo";
const ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s([^>]*class=['"]result-link['"][^>]*)>(.*?)</a>"#).expect("valid regex")
});
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href=['"]([^'"]+)['"]"#).expect("valid regex"));
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<td[^>]*class=['"]result-snippet['"][^>]*>(.*?)</td>"#).expect("valid regex")
});

/// DuckDuckGo Lite scraper.
#[derive(Debug, Clone)]
pub struct DuckDuckGoLite {
    client: reqwest::Client,
    max_results: usize,
}

impl DuckDuckGoLite {
    /// Create a scraper whose fetches time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::unavailable(NAME, e.to_string()))?;

        Ok(Self {
            client,
            max_results: MAX_RESULTS,
        })
    }

    /// Set maximum results, clamped to [`MAX_RESULTS`].
    #[must_use]
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max.min(MAX_RESULTS);
        self
    }

    fn search_url(query: &str) -> Result<Url, SearchError> {
        Url::parse_with_params(ENDPOINT, &[("q", query)])
            .map_err(|e| SearchError::unavailable(NAME, format!("invalid search URL: {e}")))
    }

    /// Parse the lite results page. Links and snippets are paired by position.
    pub(crate) fn parse_results(page: &str, max: usize) -> Vec<SearchResult> {
        let snippets: Vec<String> = SNIPPET_RE
            .captures_iter(page)
            .map(|c| html::to_text(&c[1]))
            .collect();

        LINK_RE
            .captures_iter(page)
            .enumerate()
            .filter_map(|(i, cap)| {
                let href = HREF_RE.captures(&cap[1])?.get(1)?.as_str();
                let link = resolve_redirect(&html::decode_entities(href))?;
                let title = html::to_text(&cap[2]);
                if title.is_empty() {
                    return None;
                }
                Some(SearchResult {
                    title,
                    link,
                    snippet: snippets.get(i).cloned().unwrap_or_default(),
                })
            })
            .take(max)
            .collect()
    }
}

/// Unwrap DuckDuckGo's `/l/?uddg=` redirect and normalise protocol-relative links.
fn resolve_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_owned()
    };

    let url = Url::parse(&absolute).ok()?;
    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[async_trait]
impl SearchProvider for DuckDuckGoLite {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let url = Self::search_url(query)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(NAME, &e))?;

        if !response.status().is_success() {
            return Err(SearchError::unavailable(
                NAME,
                format!("HTTP error: {}", response.status()),
            ));
        }

        let page = response
            .text()
            .await
            .map_err(|e| SearchError::from_reqwest(NAME, &e))?;

        Ok(Self::parse_results(&page, self.max_results))
    }
}
