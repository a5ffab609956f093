//! Rotate-and-retry wrapper around a single model call.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::keys::KeyPool;
use crate::model::{GenerateRequest, ModelProvider, ModelResponse, SharedModelProvider};

/// Executes model requests against a shared [`KeyPool`].
///
/// Each call makes at most one attempt per credential. A quota rejection
/// advances the pool and tries the next key immediately; any other failure
/// ends the call with [`Error::RequestFailed`]. There is no backoff.
#[derive(Clone)]
pub struct Invoker {
    pool: Arc<KeyPool>,
    provider: SharedModelProvider,
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("pool", &self.pool)
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl Invoker {
    /// Creates an invoker over `pool` and `provider`.
    #[must_use]
    pub fn new(pool: Arc<KeyPool>, provider: SharedModelProvider) -> Self {
        Self { pool, provider }
    }

    /// Creates an invoker from a concrete provider.
    #[must_use]
    pub fn with_provider<P: ModelProvider + 'static>(pool: Arc<KeyPool>, provider: P) -> Self {
        Self::new(pool, Arc::new(provider))
    }

    /// The shared key pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<KeyPool> {
        &self.pool
    }

    /// Runs the request produced by `build`, rotating keys on quota errors.
    ///
    /// `build` is called once per attempt so a request is never reused
    /// across credentials.
    ///
    /// # Errors
    ///
    /// [`Error::AllKeysExhausted`] when every key hit its quota,
    /// [`Error::RequestFailed`] on the first non-quota failure.
    pub async fn invoke<F>(&self, build: F) -> Result<ModelResponse>
    where
        F: Fn() -> GenerateRequest + Send + Sync,
    {
        let attempts = self.pool.len();

        for attempt in 0..attempts {
            let (index, credential) = self.pool.current().await;
            let request = build();
            debug!(
                agent = %request.agent,
                attempt = attempt + 1,
                key_index = index,
                provider = self.provider.provider_name(),
                "invoking model"
            );

            match self.provider.generate(&credential, &request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_quota_exceeded() => {
                    warn!(
                        agent = %request.agent,
                        key_index = index,
                        key = %credential.hint(),
                        error = %err,
                        "quota exceeded, rotating key"
                    );
                    self.pool.advance_past(index).await;
                }
                Err(err) => return Err(Error::RequestFailed(err)),
            }
        }

        Err(Error::AllKeysExhausted { attempts })
    }

    /// Convenience wrapper for a request that does not depend on the attempt.
    ///
    /// # Errors
    ///
    /// Same as [`Invoker::invoke`].
    pub async fn invoke_request(&self, request: GenerateRequest) -> Result<ModelResponse> {
        self.invoke(|| request.clone()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::llms::LlmError;
    use crate::mock::MockModel;
    use crate::model::AgentRole;

    fn request() -> GenerateRequest {
        GenerateRequest::new(AgentRole::ContentWriter, "hello")
    }

    fn invoker(keys: &[&str], model: &Arc<MockModel>) -> Invoker {
        let pool = Arc::new(KeyPool::new(keys.iter().copied()).unwrap());
        Invoker::new(pool, Arc::clone(model) as SharedModelProvider)
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let model = Arc::new(MockModel::new(|_| Ok("ok".into())));
        let invoker = invoker(&["k1", "k2"], &model);

        let response = invoker.invoke(request).await.unwrap();
        assert_eq!(response.text, "ok");
        assert_eq!(model.call_count().await, 1);
        assert_eq!(invoker.pool().position().await, 0);
    }

    #[tokio::test]
    async fn always_quota_makes_one_attempt_per_key() {
        for n in 1..=5 {
            let keys: Vec<String> = (0..n).map(|i| format!("key-{i}")).collect();
            let model = Arc::new(MockModel::new(|_| {
                Err(LlmError::rate_limited("mock", "quota"))
            }));
            let pool = Arc::new(KeyPool::new(keys.clone()).unwrap());
            let invoker = Invoker::new(pool, Arc::clone(&model) as SharedModelProvider);

            let err = invoker.invoke(request).await.unwrap_err();
            assert!(matches!(err, Error::AllKeysExhausted { attempts } if attempts == n));

            let used = model.credentials_used().await;
            assert_eq!(used.len(), n);
            let mut sorted = used.clone();
            sorted.sort();
            let mut expected = keys.clone();
            expected.sort();
            assert_eq!(sorted, expected, "each key used exactly once");
        }
    }

    #[tokio::test]
    async fn cursor_points_at_successful_key() {
        for k in 0..4 {
            let model = Arc::new(MockModel::new(move |call| {
                if call.index < k {
                    Err(LlmError::rate_limited("mock", "quota"))
                } else {
                    Ok("done".into())
                }
            }));
            let invoker = invoker(&["k0", "k1", "k2", "k3"], &model);

            invoker.invoke(request).await.unwrap();
            assert_eq!(invoker.pool().position().await, k);
            let used = model.credentials_used().await;
            assert_eq!(used.last().map(String::as_str), Some(["k0", "k1", "k2", "k3"][k]));
        }
    }

    #[tokio::test]
    async fn non_quota_error_aborts_without_rotation() {
        let model = Arc::new(MockModel::new(|_| {
            Err(LlmError::auth("mock", "invalid key"))
        }));
        let invoker = invoker(&["k1", "k2", "k3"], &model);

        let err = invoker.invoke(request).await.unwrap_err();
        assert!(matches!(err, Error::RequestFailed(LlmError::Auth { .. })));
        assert_eq!(model.call_count().await, 1);
        assert_eq!(invoker.pool().position().await, 0);
    }

    #[tokio::test]
    async fn non_quota_error_after_rotation_stops_immediately() {
        let model = Arc::new(MockModel::new(|call| match call.index {
            0 => Err(LlmError::rate_limited("mock", "quota")),
            _ => Err(LlmError::http_status(500, "boom")),
        }));
        let invoker = invoker(&["k1", "k2", "k3"], &model);

        let err = invoker.invoke(request).await.unwrap_err();
        assert!(matches!(err, Error::RequestFailed(LlmError::HttpStatus { status: 500, .. })));
        assert_eq!(model.call_count().await, 2);
        assert_eq!(invoker.pool().position().await, 1);
    }

    #[tokio::test]
    async fn rotation_persists_across_invocations() {
        let model = Arc::new(MockModel::new(|call| {
            if call.credential == "k1" {
                Err(LlmError::rate_limited("mock", "quota"))
            } else {
                Ok("fine".into())
            }
        }));
        let invoker = invoker(&["k1", "k2"], &model);

        invoker.invoke(request).await.unwrap();
        invoker.invoke(request).await.unwrap();
        assert_eq!(
            model.credentials_used().await,
            vec!["k1".to_owned(), "k2".to_owned(), "k2".to_owned()]
        );
    }
}
