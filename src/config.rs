//! Application configuration
//!
//! Model and endpoint settings come from the embedded config.toml.
//! The Gemini API key is read from the environment; a local .env file
//! is honored when present.

use crate::error::AppError;
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Config {
    pub gemini: GeminiConfig,
}

/// Gemini endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiConfig {
    /// Model name, e.g. "gemini-3-flash-preview"
    pub model: String,
    /// Base URL of the generative language API, up to and including "/models"
    pub base_url: String,
}

/// Environment variable holding the Gemini API key
pub(crate) const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Load configuration from embedded config.toml
pub(crate) fn load_config() -> Result<Config, AppError> {
    const CONFIG_TOML: &str = include_str!("../config.toml");
    toml::from_str(CONFIG_TOML)
        .map_err(|e| AppError::Config(format!("Invalid embedded config.toml: {e}")))
}

/// Read the Gemini API key from the environment
pub(crate) fn api_key_from_env() -> Result<String, AppError> {
    std::env::var(API_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            AppError::Config(format!(
                "{API_KEY_VAR} is not set. Export it or add it to a .env file."
            ))
        })
}
