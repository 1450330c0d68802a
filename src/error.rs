//! Error types and result aliases for the weather agent.
//!
//! This module defines the core error type [`WeatherAgentError`] and the [`Result`] type
//! alias used throughout the crate. Nothing below `main` terminates the process; every
//! failure travels back to the caller as one of these values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherAgentError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

impl WeatherAgentError {
    /// Whether a tool failure must end the whole turn.
    ///
    /// Transport failures abort the turn and surface from `send_and_wait`. Every other
    /// tool failure is handed back to the model as a tool error result.
    pub fn aborts_turn(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::IoError(_))
    }
}

pub type Result<T> = std::result::Result<T, WeatherAgentError>;
