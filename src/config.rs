//! Process configuration read from the environment and an optional `.env` file.

use crate::error::{Result, WeatherAgentError};
use crate::llm::gateways::OpenAIConfig;
use crate::session::DEFAULT_MODEL;
use crate::weather::{Units, WeatherConfig, DEFAULT_BASE_URL};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

/// Everything the binary needs to start a session
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    pub weather: WeatherConfig,
    pub openai: OpenAIConfig,
}

impl AgentConfig {
    /// Load `.env` from the working directory, then read the process environment.
    ///
    /// A missing `.env` is not an error. Variables already set in the process
    /// environment take precedence over the file.
    pub fn from_env() -> Result<Self> {
        match dotenv::dotenv() {
            Ok(path) => debug!(path = %path.display(), "Loaded environment file"),
            Err(e) => debug!(error = %e, "No environment file loaded"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from a specific env file without touching the process environment.
    ///
    /// Process variables still override values from the file.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_overrides(path.as_ref(), |key| std::env::var(key).ok())
    }

    /// Read `path`, letting `overrides` take precedence over the file's values
    fn from_file_with_overrides<F>(path: &Path, overrides: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_vars = read_env_file(path)?;
        Self::from_lookup(|key| overrides(key).or_else(|| file_vars.get(key).cloned()))
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = read("API_KEY").ok_or_else(|| {
            WeatherAgentError::ConfigError("API_KEY is not set".to_string())
        })?;

        let units = match read("WEATHER_UNITS") {
            Some(raw) => raw.parse::<Units>()?,
            None => Units::default(),
        };

        let weather = WeatherConfig::new(api_key)
            .with_base_url(read("WEATHER_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))
            .with_units(units);

        let openai = OpenAIConfig {
            api_key: read("OPENAI_API_KEY").unwrap_or_default(),
            base_url: read("OPENAI_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            timeout: None,
        };

        Ok(Self {
            model: read("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            weather,
            openai,
        })
    }
}

/// Parse an env file into a map.
// `from_path_iter` is deprecated in dotenv 0.15 but is its only API that does not
// write into the process environment.
#[allow(deprecated)]
fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let entries = dotenv::from_path_iter(path).map_err(|e| {
        WeatherAgentError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;

    let mut vars = HashMap::new();
    for entry in entries {
        let (key, value) = entry.map_err(|e| {
            WeatherAgentError::ConfigError(format!("cannot parse {}: {}", path.display(), e))
        })?;
        vars.insert(key, value);
    }
    Ok(vars)
}
