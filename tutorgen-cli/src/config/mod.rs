//! Configuration management for the tutorgen CLI.
//!
//! Settings are layered, later sources winning:
//! 1. Default values
//! 2. Config file (`~/.tutorgen/config.toml`)
//! 3. Environment variables
//! 4. Command-line flags

mod schema;

pub use schema::TutorConfig;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    /// Missing required field.
    #[error("missing required config: {0}")]
    MissingField(String),
    /// Invalid value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Get the default config directory path.
#[must_use]
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tutorgen")
}

/// Get the default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a specific path, falling back to defaults when
/// the file does not exist.
pub async fn load_config_from(path: &Path) -> ConfigResult<TutorConfig> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(TutorConfig::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: TutorConfig = toml::from_str(&content)?;
    debug!(path = %path.display(), "loaded config file");

    Ok(config)
}

/// Load the file at `path` and apply process environment overrides.
pub async fn load_effective(path: &Path) -> ConfigResult<TutorConfig> {
    let mut config = load_config_from(path).await?;
    config.apply_env(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

/// Save configuration to a specific path.
pub async fn save_config_to(config: &TutorConfig, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = toml::to_string_pretty(config)?;
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), "saved config file");

    Ok(())
}

/// Write a default config to `path` unless one exists.
///
/// Returns `true` if a file was written.
pub async fn init_config(path: &Path, force: bool) -> ConfigResult<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    save_config_to(&TutorConfig::default(), path).await?;
    Ok(true)
}
