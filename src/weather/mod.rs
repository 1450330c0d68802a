//! Current-weather lookups against the provider's HTTP API.

pub mod client;
pub mod models;

pub use client::{WeatherClient, WeatherConfig, DEFAULT_BASE_URL};
pub use models::{Units, WeatherQuery, WeatherReading, WeatherResponse, WeatherToolResult};
