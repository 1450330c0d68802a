//! Scripted gateway and tools shared by the broker and session tests.

use crate::error::{Result, WeatherAgentError};
use crate::llm::gateway::{CompletionConfig, LlmGateway, StreamChunk};
use crate::llm::models::{LlmGatewayResponse, LlmMessage, LlmToolCall};
use crate::llm::tools::{LlmTool, ToolDescriptor};
use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted engine response
pub enum Script {
    Chunks(Vec<StreamChunk>),
    Fail(String),
    /// Never completes; used to hold a turn open
    Hang,
}

/// Gateway that replays scripted responses and records the conversation it was sent.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<LlmGatewayResponse>>,
    seen: Mutex<Vec<Vec<LlmMessage>>>,
}

impl ScriptedGateway {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        }
    }

    pub fn with_completions(completions: Vec<LlmGatewayResponse>) -> Self {
        Self {
            completions: Mutex::new(completions.into()),
            ..Default::default()
        }
    }

    /// Conversations received, one entry per engine call
    pub fn seen(&self) -> Vec<Vec<LlmMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn complete(
        &self,
        _model: &str,
        messages: &[LlmMessage],
        _tools: Option<&[Box<dyn LlmTool>]>,
        _config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| WeatherAgentError::GatewayError("no scripted completion".to_string()))
    }

    fn complete_stream<'a>(
        &'a self,
        _model: &'a str,
        messages: &'a [LlmMessage],
        _tools: Option<&'a [Box<dyn LlmTool>]>,
        _config: &'a CompletionConfig,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send + 'a>> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let script = self.scripts.lock().unwrap().pop_front();

        match script {
            Some(Script::Chunks(chunks)) => {
                let items: Vec<Result<StreamChunk>> = chunks.into_iter().map(Ok).collect();
                Box::pin(stream::iter(items))
            }
            Some(Script::Fail(message)) => {
                let items: Vec<Result<StreamChunk>> =
                    vec![Err(WeatherAgentError::GatewayError(message))];
                Box::pin(stream::iter(items))
            }
            Some(Script::Hang) => Box::pin(async_stream::stream! {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                let item: Result<StreamChunk> = Ok(StreamChunk::Content(String::new()));
                yield item;
            }),
            None => {
                let items: Vec<Result<StreamChunk>> =
                    vec![Ok(StreamChunk::Content("default response".to_string()))];
                Box::pin(stream::iter(items))
            }
        }
    }
}

/// Tool returning a fixed outcome
pub struct StaticTool {
    pub name: String,
    pub outcome: fn() -> Result<Value>,
}

impl StaticTool {
    pub fn ok(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: || Ok(json!({"city": "Anchorage", "temperature": "41.5°F", "humidity": "81"})),
        }
    }
}

#[async_trait]
impl LlmTool for StaticTool {
    async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
        (self.outcome)()
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(self.name.clone(), "A scripted tool", json!({"type": "object"}))
    }
}

pub fn tool_call(id: &str, name: &str, city: &str) -> LlmToolCall {
    let mut arguments = HashMap::new();
    arguments.insert("city".to_string(), json!(city));
    LlmToolCall {
        id: Some(id.to_string()),
        name: name.to_string(),
        arguments,
    }
}

pub fn content(text: &str) -> StreamChunk {
    StreamChunk::Content(text.to_string())
}
