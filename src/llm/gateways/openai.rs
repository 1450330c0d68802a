//! OpenAI Gateway for LLM interactions.
//!
//! This module provides a gateway for any OpenAI-compatible chat-completions
//! endpoint, including server-sent-event streaming with tool calls.

use crate::error::{Result, WeatherAgentError};
use crate::llm::gateway::{CompletionConfig, LlmGateway, StreamChunk};
use crate::llm::gateways::openai_messages_adapter::{
    adapt_messages_to_openai, convert_tool_calls, parse_arguments,
};
use crate::llm::models::{LlmGatewayResponse, LlmMessage, LlmToolCall};
use crate::llm::tools::LlmTool;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use tracing::{debug, info, warn};

/// Configuration for connecting to OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<std::time::Duration>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_API_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            timeout: None,
        }
    }
}

/// Gateway for OpenAI-compatible chat engines.
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIGateway {
    /// Create a new OpenAI gateway with default configuration.
    pub fn new() -> Self {
        Self::with_config(OpenAIConfig::default())
    }

    /// Create a new OpenAI gateway with custom configuration.
    pub fn with_config(config: OpenAIConfig) -> Self {
        let mut client_builder = Client::builder();

        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        let client = client_builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            Client::new()
        });

        Self { client, config }
    }

    /// Create gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self::with_config(OpenAIConfig {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    fn build_body(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
        stream: bool,
    ) -> Result<Value> {
        let mut body = serde_json::json!({
            "model": model,
            "messages": adapt_messages_to_openai(messages)?,
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
            "stream": stream,
        });

        if let Some(tools) = tools {
            if !tools.is_empty() {
                let tool_defs: Vec<_> = tools.iter().map(|t| t.descriptor()).collect();
                body["tools"] = serde_json::to_value(tool_defs)?;
            }
        }

        Ok(body)
    }

    async fn post_completion(&self, body: &Value) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WeatherAgentError::GatewayError(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        Ok(response)
    }
}

impl Default for OpenAIGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmGateway for OpenAIGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to OpenAI for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let body = self.build_body(model, messages, tools, config, false)?;
        let response_body: Value = self.post_completion(&body).await?.json().await?;

        let message = &response_body["choices"][0]["message"];
        let content = message["content"].as_str().map(String::from);
        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| convert_tool_calls(calls))
            .unwrap_or_default();

        Ok(LlmGatewayResponse {
            content,
            tool_calls,
        })
    }

    fn complete_stream<'a>(
        &'a self,
        model: &'a str,
        messages: &'a [LlmMessage],
        tools: Option<&'a [Box<dyn LlmTool>]>,
        config: &'a CompletionConfig,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            info!("Starting OpenAI streaming completion");
            debug!("Model: {}, Message count: {}", model, messages.len());

            let body = match self.build_body(model, messages, tools, config, true) {
                Ok(body) => body,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let response = match self.post_completion(&body).await {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut bytes_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            let mut decoder = SseDecoder::default();

            while let Some(chunk_result) = bytes_stream.next().await {
                let bytes = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(e.into());
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                // Process complete SSE lines; a multi-byte character may straddle chunks
                while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line);
                    for chunk in decoder.decode_line(&line) {
                        yield Ok(chunk);
                    }
                }
            }

            if !buffer.is_empty() {
                let line = String::from_utf8_lossy(&buffer).into_owned();
                for chunk in decoder.decode_line(&line) {
                    yield Ok(chunk);
                }
            }

            if let Some(chunk) = decoder.finish() {
                yield Ok(chunk);
            }
        })
    }
}

/// Accumulator for streaming tool calls.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Turns `data:` lines of a chat-completions event stream into [`StreamChunk`]s.
///
/// Tool-call fragments are accumulated by index and released as one
/// [`StreamChunk::ToolCalls`] when the engine reports `finish_reason: "tool_calls"`,
/// on `[DONE]`, or from [`SseDecoder::finish`].
#[derive(Debug, Default)]
struct SseDecoder {
    tool_calls: BTreeMap<usize, ToolCallAccumulator>,
}

impl SseDecoder {
    fn decode_line(&mut self, line: &str) -> Vec<StreamChunk> {
        let line = line.trim();
        let Some(data) = line.strip_prefix("data:") else {
            return Vec::new();
        };
        let data = data.trim_start();

        if data == "[DONE]" {
            return self.finish().into_iter().collect();
        }

        let json = match serde_json::from_str::<Value>(data) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to parse streaming chunk: {}", e);
                return Vec::new();
            }
        };

        let Some(choice) = json["choices"].as_array().and_then(|c| c.first()) else {
            return Vec::new();
        };

        let mut chunks = Vec::new();
        let delta = &choice["delta"];

        if let Some(content) = delta["content"].as_str() {
            if !content.is_empty() {
                chunks.push(StreamChunk::Content(content.to_string()));
            }
        }

        if let Some(fragments) = delta["tool_calls"].as_array() {
            for tc in fragments {
                let Some(index) = tc["index"].as_u64() else {
                    continue;
                };
                let acc = self.tool_calls.entry(index as usize).or_default();

                // First fragment carries id and name, all may carry argument text
                if let Some(id) = tc["id"].as_str() {
                    acc.id = Some(id.to_string());
                }
                if let Some(name) = tc["function"]["name"].as_str() {
                    acc.name = Some(name.to_string());
                }
                if let Some(args) = tc["function"]["arguments"].as_str() {
                    acc.arguments.push_str(args);
                }
            }
        }

        if choice["finish_reason"].as_str() == Some("tool_calls") {
            chunks.extend(self.finish());
        }

        chunks
    }

    /// Release any accumulated tool calls
    fn finish(&mut self) -> Option<StreamChunk> {
        if self.tool_calls.is_empty() {
            return None;
        }

        let calls: Vec<LlmToolCall> = std::mem::take(&mut self.tool_calls)
            .into_values()
            .filter_map(|acc| {
                Some(LlmToolCall {
                    id: acc.id,
                    name: acc.name?,
                    arguments: parse_arguments(&acc.arguments),
                })
            })
            .collect();

        if calls.is_empty() {
            None
        } else {
            Some(StreamChunk::ToolCalls(calls))
        }
    }
}
