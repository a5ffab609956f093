//! Errors surfaced by the command-line front end.

use crate::config::ConfigError;

/// Result type alias for CLI commands.
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded or is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Library error outside of a run (client construction, bad key list).
    #[error(transparent)]
    Tutorgen(#[from] tutorgen::Error),

    /// Writing the output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The run stopped before every section was written.
    #[error("run did not complete: {0}")]
    Incomplete(String),
}
