use crate::error::{Result, WeatherAgentError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unit system requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
    Standard,
}

impl Units {
    /// Value sent as the `units` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
            Units::Standard => "standard",
        }
    }

    /// Suffix appended to a formatted temperature
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
            Units::Standard => "K",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = WeatherAgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "imperial" => Ok(Units::Imperial),
            "metric" => Ok(Units::Metric),
            "standard" => Ok(Units::Standard),
            other => Err(WeatherAgentError::ConfigError(format!(
                "unknown unit system '{}' (expected imperial, metric or standard)",
                other
            ))),
        }
    }
}

/// Arguments of one `get_weather` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherQuery {
    pub city: String,
}

impl WeatherQuery {
    pub fn new(city: impl Into<String>) -> Self {
        Self { city: city.into() }
    }
}

/// The `main` block of a current-weather response.
///
/// Fields the provider omits for a location (sea level, ground level) default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherReading {
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub sea_level: i64,
    #[serde(rename = "grnd_level")]
    pub ground_level: i64,
}

/// Envelope of the provider's response body. Only `main` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherResponse {
    pub main: WeatherReading,
}

/// Error body returned alongside non-2xx statuses, e.g. `{"cod":"404","message":"city not found"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderError {
    #[serde(default)]
    pub message: String,
}

/// Compact result handed back to the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherToolResult {
    pub city: String,
    pub temperature: String,
    pub humidity: String,
}

impl WeatherToolResult {
    /// Project a reading into the result shape, formatting temperature to one decimal.
    pub fn from_reading(city: impl Into<String>, reading: &WeatherReading, units: Units) -> Self {
        Self {
            city: city.into(),
            temperature: format!("{:.1}{}", reading.temperature, units.temperature_suffix()),
            humidity: reading.humidity.to_string(),
        }
    }
}
