//! LLM backend implementations.
//!
//! # Available Backends
//!
//! - [`openai`] - any OpenAI-compatible chat completions endpoint
//!   (Gemini's compatibility layer by default)

mod error;
pub mod openai;

pub use error::LlmError;
pub use openai::{OpenAI, OpenAIConfig};
