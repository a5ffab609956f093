//! Scripted model and search doubles for testing.
//!
//! These let pipeline behavior (rotation counts, ordering, partial failure)
//! be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use tutorgen::mock::MockModel;
//!
//! let model = MockModel::new(|call| Ok(format!("reply #{}", call.index)));
//! ```

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::keys::Credential;
use crate::llms::LlmError;
use crate::model::{GenerateRequest, ModelProvider, ModelResponse};
use crate::search::{SearchError, SearchProvider, SearchResult};

type Responder = dyn Fn(&MockCall) -> Result<String, LlmError> + Send + Sync;

/// One recorded call to a [`MockModel`].
#[derive(Debug, Clone)]
pub struct MockCall {
    /// Zero-based call number across the model's lifetime.
    pub index: usize,
    /// The raw credential the call was made with.
    pub credential: String,
    /// The request as received.
    pub request: GenerateRequest,
}

/// A model whose replies are computed by a closure.
pub struct MockModel {
    responder: Box<Responder>,
    calls: Mutex<Vec<MockCall>>,
}

impl std::fmt::Debug for MockModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockModel").finish_non_exhaustive()
    }
}

impl MockModel {
    /// Create a mock model driven by `responder`.
    #[must_use]
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&MockCall) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// All calls received so far.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Credentials in call order.
    pub async fn credentials_used(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|c| c.credential.clone())
            .collect()
    }
}

#[async_trait]
impl ModelProvider for MockModel {
    async fn generate(
        &self,
        credential: &Credential,
        request: &GenerateRequest,
    ) -> Result<ModelResponse, LlmError> {
        let call = {
            let mut calls = self.calls.lock().await;
            let call = MockCall {
                index: calls.len(),
                credential: credential.expose().to_owned(),
                request: request.clone(),
            };
            calls.push(call.clone());
            call
        };

        (self.responder)(&call).map(ModelResponse::text)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A search provider returning a fixed outcome.
#[derive(Debug)]
pub struct MockSearch {
    name: &'static str,
    outcome: Result<Vec<SearchResult>, SearchError>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    /// A provider that always returns `results`.
    #[must_use]
    pub fn returning(name: &'static str, results: Vec<SearchResult>) -> Self {
        Self {
            name,
            outcome: Ok(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A provider that always fails with `error`.
    #[must_use]
    pub fn failing(name: &'static str, error: SearchError) -> Self {
        Self {
            name,
            outcome: Err(error),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().await.push(query.to_owned());
        self.outcome.clone()
    }
}
