//! # weather-agent
//!
//! A conversational weather assistant. A chat session drives an OpenAI-compatible
//! engine that may call a single `get_weather` tool; the tool fetches current
//! conditions from a weather provider and the reply streams back to the terminal.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use weather_agent::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> weather_agent::Result<()> {
//!     let config = AgentConfig::from_env()?;
//!     let gateway = Arc::new(OpenAIGateway::with_config(config.openai));
//!     let tool = GetWeatherTool::new(WeatherClient::new(config.weather));
//!
//!     let session = Session::create(
//!         gateway,
//!         SessionConfig {
//!             model: config.model,
//!             tools: vec![Box::new(tool)],
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     let reply = session
//!         .send_and_wait(MessageOptions::new("What is the weather in Anchorage?"), None)
//!         .await?;
//!     println!("{}", reply.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod repl;
pub mod session;
pub mod weather;

pub use error::{Result, WeatherAgentError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::AgentConfig;
    pub use crate::error::{Result, WeatherAgentError};
    pub use crate::llm::gateways::{OpenAIConfig, OpenAIGateway};
    pub use crate::llm::tools::{GetWeatherTool, LlmTool, ToolDescriptor};
    pub use crate::llm::{CompletionConfig, LlmGateway, LlmMessage, MessageRole};
    pub use crate::repl::{run_repl, Conversation};
    pub use crate::session::{MessageOptions, Session, SessionConfig, SessionEvent, StreamPrinter};
    pub use crate::weather::{Units, WeatherClient, WeatherConfig};
}
