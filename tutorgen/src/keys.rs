//! Credential pool with a shared rotation cursor.
//!
//! A [`KeyPool`] is built once at startup from an ordered, non-empty list of
//! API keys and shared (behind an `Arc`) by every in-flight pipeline run. The
//! cursor is the only cross-run mutable state in the crate.

use std::fmt;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// An opaque API secret.
///
/// `Debug` and `Display` never print the secret itself.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the raw secret for use in an auth header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Last four characters, for log correlation.
    #[must_use]
    pub fn hint(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("…{tail}")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Ordered credentials plus a lock-guarded rotation cursor.
#[derive(Debug)]
pub struct KeyPool {
    credentials: Vec<Credential>,
    cursor: Mutex<usize>,
}

impl KeyPool {
    /// Builds a pool. Fails when `credentials` is empty or holds a blank key.
    pub fn new<I, C>(credentials: I) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Credential>,
    {
        let credentials: Vec<Credential> = credentials.into_iter().map(Into::into).collect();
        if credentials.is_empty() {
            return Err(Error::config("at least one API key is required"));
        }
        if let Some(pos) = credentials.iter().position(|c| c.expose().trim().is_empty()) {
            return Err(Error::config(format!("API key #{pos} is empty")));
        }

        Ok(Self {
            credentials,
            cursor: Mutex::new(0),
        })
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; construction rejects empty pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Current cursor position.
    pub async fn position(&self) -> usize {
        *self.cursor.lock().await
    }

    /// The credential under the cursor.
    pub async fn current_credential(&self) -> Credential {
        self.current().await.1
    }

    /// The cursor position and the credential under it, read atomically.
    pub async fn current(&self) -> (usize, Credential) {
        let cursor = self.cursor.lock().await;
        (*cursor, self.credentials[*cursor].clone())
    }

    /// Moves the cursor forward by one, wrapping.
    pub async fn advance(&self) {
        let mut cursor = self.cursor.lock().await;
        *cursor = (*cursor + 1) % self.credentials.len();
        debug!(position = *cursor, "advanced key cursor");
    }

    /// Moves the cursor forward only if it still points at `observed`.
    ///
    /// Returns whether this call moved the cursor. Concurrent callers that
    /// saw the same rejected key rotate the pool once between them.
    pub async fn advance_past(&self, observed: usize) -> bool {
        let mut cursor = self.cursor.lock().await;
        if *cursor != observed {
            debug!(
                observed,
                position = *cursor,
                "key cursor already moved by another caller"
            );
            return false;
        }
        *cursor = (*cursor + 1) % self.credentials.len();
        debug!(position = *cursor, "advanced key cursor");
        true
    }
}
