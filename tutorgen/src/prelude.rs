//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tutorgen::prelude::*;
//! ```

pub use crate::error::{Error, LlmError, Result, SearchError};
pub use crate::invoker::Invoker;
pub use crate::keys::{Credential, KeyPool};
pub use crate::llms::{OpenAI, OpenAIConfig};
pub use crate::model::{
    AgentRole, GenerateRequest, ModelProvider, ModelResponse, SharedModelProvider,
};
pub use crate::outline::{OutlineEntry, SEARCH_MARKER};
pub use crate::pipeline::{
    CancelSignal, ChannelObserver, PipelineConfig, PipelineContext, PipelineEvent,
    PipelineObserver, ProgressiveOutputStore, RunState, RunStatus, SectionArtifact, Source,
    TimeSensitivity, TutorialPipeline, TutorialRequest, TutorialRun,
};
pub use crate::search::{
    DuckDuckGoLite, ResolvedSearch, ResolverConfig, SearchProvider, SearchResolver, SearchResult,
    SerperSearch,
};
