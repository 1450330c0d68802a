//! HTTP client for the current-weather provider.
//!
//! The client performs exactly one GET per lookup, with no retry and no timeout
//! override, and reshapes the provider's `main` block into a [`WeatherToolResult`].

use crate::error::{Result, WeatherAgentError};
use crate::weather::models::{ProviderError, Units, WeatherResponse, WeatherToolResult};
use reqwest::Client;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Immutable settings for talking to the weather provider.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub units: Units,
    /// Print `STATUS CODE:<code>` to stdout after each response
    pub report_status: bool,
}

impl WeatherConfig {
    /// Create a configuration for the default provider endpoint in imperial units.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
            report_status: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_report_status(mut self, report_status: bool) -> Self {
        self.report_status = report_status;
        self
    }
}

/// Client for the current-weather endpoint.
///
/// # Examples
///
/// ```ignore
/// use weather_agent::weather::{WeatherClient, WeatherConfig};
///
/// let client = WeatherClient::new(WeatherConfig::new("my-api-key"));
/// let result = client.fetch("Anchorage").await?;
/// println!("{} is {}", result.city, result.temperature);
/// ```
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Creates a WeatherClient with a custom HTTP client (for testing)
    #[cfg(test)]
    pub fn with_client(client: Client, config: WeatherConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &WeatherConfig {
        &self.config
    }

    /// Build `<base>?q=<city>&units=<units>&appid=<key>`.
    pub fn request_url(&self, city: &str) -> String {
        format!(
            "{}?q={}&units={}&appid={}",
            self.config.base_url,
            urlencoding::encode(city),
            self.config.units,
            urlencoding::encode(&self.config.api_key)
        )
    }

    /// Fetch the current weather for `city`.
    ///
    /// Transport failures come back as [`WeatherAgentError::HttpError`], non-2xx
    /// statuses as [`WeatherAgentError::ApiError`] and unparsable bodies as
    /// [`WeatherAgentError::SerializationError`].
    pub async fn fetch(&self, city: &str) -> Result<WeatherToolResult> {
        let url = self.request_url(city);
        debug!(city = city, units = %self.config.units, "Requesting current weather");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if self.config.report_status {
            println!("STATUS CODE:{}\n", status.as_u16());
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ProviderError>(&body)
                .ok()
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            return Err(WeatherAgentError::ApiError(format!(
                "weather provider returned {}: {}",
                status, message
            )));
        }

        let parsed: WeatherResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(city = city, error = %e, "Malformed weather response");
            e
        })?;

        let result = WeatherToolResult::from_reading(city, &parsed.main, self.config.units);
        info!(
            city = city,
            temperature = %result.temperature,
            humidity = %result.humidity,
            "Weather lookup complete"
        );

        Ok(result)
    }
}
