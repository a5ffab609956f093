//! OpenAI-compatible chat completions client.
//!
//! The API key is supplied per request by the invoker, so one client serves
//! the whole key pool.

mod client;
mod config;
mod types;

pub use client::OpenAI;
pub use config::OpenAIConfig;
