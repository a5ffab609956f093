//! Tutorgen - A multi-agent tutorial generator
//!
//! This crate turns a topic into a markdown tutorial through a sequence of
//! language-model calls: topic analysis, outline planning, then one writing
//! call per section, optionally grounded in a web search. Every model call
//! goes through an [`Invoker`] that rotates across a pool of API keys when a
//! key runs out of quota.

pub mod error;
pub mod invoker;
pub mod keys;
pub mod llms;
pub mod mock;
pub mod model;
pub mod outline;
pub mod pipeline;
pub mod prelude;
pub mod prompts;
pub mod search;

pub use error::{Error, LlmError, Result, SearchError};
pub use invoker::Invoker;
pub use keys::{Credential, KeyPool};
