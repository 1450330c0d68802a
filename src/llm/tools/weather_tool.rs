use crate::error::{Result, WeatherAgentError};
use crate::llm::tools::{LlmTool, ToolDescriptor};
use crate::weather::{WeatherClient, WeatherQuery};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const GET_WEATHER_TOOL_NAME: &str = "get_weather";

/// Tool that looks up the current weather for a city
///
/// The tool is a thin adapter: it validates the `city` argument and hands it to
/// [`WeatherClient::fetch`], returning the compact result as JSON.
///
/// # Examples
///
/// ```ignore
/// use weather_agent::llm::tools::weather_tool::GetWeatherTool;
/// use weather_agent::weather::{WeatherClient, WeatherConfig};
///
/// let tool = GetWeatherTool::new(WeatherClient::new(WeatherConfig::new(api_key)));
/// let mut args = HashMap::new();
/// args.insert("city".to_string(), serde_json::json!("Anchorage"));
///
/// let result = tool.run(&args).await?;
/// // {"city": "Anchorage", "temperature": "41.5°F", "humidity": "81"}
/// ```
#[derive(Debug, Clone)]
pub struct GetWeatherTool {
    client: WeatherClient,
}

impl GetWeatherTool {
    pub fn new(client: WeatherClient) -> Self {
        Self { client }
    }

    fn parse_query(args: &HashMap<String, Value>) -> Result<WeatherQuery> {
        let city = args.get("city").and_then(|v| v.as_str()).ok_or_else(|| {
            WeatherAgentError::InvalidArgument("city parameter is required".to_string())
        })?;

        if city.is_empty() {
            return Err(WeatherAgentError::InvalidArgument(
                "city parameter cannot be empty".to_string(),
            ));
        }

        Ok(WeatherQuery::new(city))
    }
}

#[async_trait]
impl LlmTool for GetWeatherTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let query = Self::parse_query(args)?;
        let result = self.client.fetch(&query.city).await?;
        Ok(serde_json::to_value(result)?)
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(
            GET_WEATHER_TOOL_NAME,
            "Get the current weather for a city",
            json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "The city name"
                    }
                },
                "required": ["city"]
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::WeatherConfig;
    use mockito::{Matcher, Server};

    fn tool_for(base_url: &str) -> GetWeatherTool {
        let config = WeatherConfig::new("test-key")
            .with_base_url(base_url)
            .with_report_status(false);
        GetWeatherTool::new(WeatherClient::new(config))
    }

    fn city_args(city: &str) -> HashMap<String, Value> {
        let mut args = HashMap::new();
        args.insert("city".to_string(), json!(city));
        args
    }

    #[test]
    fn test_descriptor() {
        let tool = tool_for("http://localhost");
        let descriptor = tool.descriptor();

        assert_eq!(descriptor.r#type, "function");
        assert_eq!(descriptor.function.name, "get_weather");
        assert_eq!(descriptor.function.description, "Get the current weather for a city");

        let params = descriptor.function.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["city"]["type"], "string");
        assert_eq!(params["properties"]["city"]["description"], "The city name");
        assert_eq!(params["required"], json!(["city"]));
    }

    #[test]
    fn test_tool_matches() {
        let tool = tool_for("http://localhost");
        assert!(tool.matches("get_weather"));
        assert!(!tool.matches("get_forecast"));
    }

    #[tokio::test]
    async fn test_run_missing_city() {
        let tool = tool_for("http://localhost");
        let result = tool.run(&HashMap::new()).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("city parameter is required"));
        assert!(!err.aborts_turn());
    }

    #[tokio::test]
    async fn test_run_empty_city() {
        let tool = tool_for("http://localhost");
        let result = tool.run(&city_args("")).await;

        assert!(result.unwrap_err().to_string().contains("city parameter cannot be empty"));
    }

    #[tokio::test]
    async fn test_run_non_string_city() {
        let tool = tool_for("http://localhost");
        let mut args = HashMap::new();
        args.insert("city".to_string(), json!(42));

        assert!(tool.run(&args).await.is_err());
    }

    #[tokio::test]
    async fn test_run_returns_structured_result() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::UrlEncoded("q".into(), "Anchorage".into()))
            .with_status(200)
            .with_body(r#"{"main":{"temp":41.46,"feels_like":37.0,"humidity":81}}"#)
            .create_async()
            .await;

        let tool = tool_for(&format!("{}/weather", server.url()));
        let result = tool.run(&city_args("Anchorage")).await.unwrap();

        assert_eq!(
            result,
            json!({"city": "Anchorage", "temperature": "41.5°F", "humidity": "81"})
        );

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_surfaces_malformed_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let tool = tool_for(&format!("{}/weather", server.url()));
        let err = tool.run(&city_args("Anchorage")).await.unwrap_err();

        assert!(matches!(err, WeatherAgentError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_run_repeatedly_and_concurrently() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/weather")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"main":{"temp":60,"humidity":50}}"#)
            .expect(3)
            .create_async()
            .await;

        let tool = tool_for(&format!("{}/weather", server.url()));
        let args = [city_args("Oslo"), city_args("Rome"), city_args("Lima")];

        let results =
            futures::future::join_all(args.iter().map(|a| tool.run(a))).await;

        let cities: Vec<_> = results
            .into_iter()
            .map(|r| r.unwrap()["city"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(cities, vec!["Oslo", "Rome", "Lima"]);

        mock.assert_async().await;
    }
}
