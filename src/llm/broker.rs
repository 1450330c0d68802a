use crate::error::{Result, WeatherAgentError};
use crate::llm::gateway::{CompletionConfig, LlmGateway, StreamChunk};
use crate::llm::models::{LlmMessage, LlmToolCall};
use crate::llm::tools::LlmTool;
use futures::stream::{Stream, StreamExt};
use serde_json::{json, Value};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

/// Something that happened while the broker was running a turn
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    /// Incremental assistant text (streaming mode only)
    Content(String),
    /// The engine asked for a tool and the broker is about to run it
    ToolCallStarted(LlmToolCall),
    /// A tool finished; failed tools carry `{"error": ...}` as their result
    ToolCallFinished {
        call: LlmToolCall,
        success: bool,
        result: Value,
    },
    /// A message was appended to the conversation
    Message(LlmMessage),
}

/// Main interface for LLM interactions
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one conversation turn.
    ///
    /// Returns a stream of [`BrokerEvent`]s. Whenever the engine requests tool calls,
    /// the broker runs them in order, feeds each result back to the engine and asks
    /// again; the turn ends with the first assistant message that requests no tools.
    ///
    /// A tool failure that [`WeatherAgentError::aborts_turn`] ends the stream with
    /// that error. Any other tool failure is sent to the engine as an error result.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures::stream::StreamExt;
    ///
    /// let broker = LlmBroker::new("gpt-4.1", gateway);
    /// let messages = vec![LlmMessage::user("What is the weather in Anchorage?")];
    ///
    /// let mut stream = broker.run_turn(messages, &tools, &config, true);
    /// while let Some(event) = stream.next().await {
    ///     if let BrokerEvent::Content(text) = event? {
    ///         print!("{}", text);
    ///     }
    /// }
    /// ```
    pub fn run_turn<'a>(
        &'a self,
        messages: Vec<LlmMessage>,
        tools: &'a [Box<dyn LlmTool>],
        config: &'a CompletionConfig,
        streaming: bool,
    ) -> Pin<Box<dyn Stream<Item = Result<BrokerEvent>> + Send + 'a>> {
        Box::pin(async_stream::stream! {
            let mut conversation = messages;

            loop {
                let mut content = String::new();
                let mut tool_calls: Vec<LlmToolCall> = Vec::new();

                if streaming {
                    let mut stream =
                        self.gateway.complete_stream(&self.model, &conversation, Some(tools), config);

                    while let Some(chunk_result) = stream.next().await {
                        match chunk_result {
                            Ok(StreamChunk::Content(text)) => {
                                content.push_str(&text);
                                yield Ok(BrokerEvent::Content(text));
                            }
                            Ok(StreamChunk::ToolCalls(calls)) => {
                                tool_calls.extend(calls);
                            }
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                } else {
                    match self.gateway.complete(&self.model, &conversation, Some(tools), config).await {
                        Ok(response) => {
                            content = response.content.unwrap_or_default();
                            tool_calls = response.tool_calls;
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                if tool_calls.is_empty() {
                    yield Ok(BrokerEvent::Message(LlmMessage::assistant(content)));
                    return;
                }

                info!("Tool calls requested: {}", tool_calls.len());

                let request = LlmMessage::assistant_tool_calls(content, tool_calls.clone());
                conversation.push(request.clone());
                yield Ok(BrokerEvent::Message(request));

                for call in &tool_calls {
                    yield Ok(BrokerEvent::ToolCallStarted(call.clone()));

                    let outcome = match tools.iter().find(|t| t.matches(&call.name)) {
                        Some(tool) => {
                            info!("Executing tool: {}", call.name);
                            tool.run(&call.arguments).await
                        }
                        None => {
                            warn!("Tool not found: {}", call.name);
                            Err(WeatherAgentError::ToolError(format!("unknown tool '{}'", call.name)))
                        }
                    };

                    let (success, result) = match outcome {
                        Ok(value) => (true, value),
                        Err(e) if e.aborts_turn() => {
                            warn!(tool = %call.name, error = %e, "Tool failure aborts the turn");
                            yield Err(e);
                            return;
                        }
                        Err(e) => {
                            warn!(tool = %call.name, error = %e, "Tool execution failed");
                            (false, json!({ "error": e.to_string() }))
                        }
                    };

                    let reply_content = match serde_json::to_string(&result) {
                        Ok(s) => s,
                        Err(e) => {
                            yield Err(e.into());
                            return;
                        }
                    };

                    let reply = LlmMessage::tool_result(call, reply_content);
                    conversation.push(reply.clone());

                    yield Ok(BrokerEvent::ToolCallFinished {
                        call: call.clone(),
                        success,
                        result,
                    });
                    yield Ok(BrokerEvent::Message(reply));
                }
            }
        })
    }
}
