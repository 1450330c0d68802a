pub mod broker;
pub mod gateway;
pub mod gateways;
pub mod models;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;

pub use broker::{BrokerEvent, LlmBroker};
pub use gateway::{CompletionConfig, LlmGateway, StreamChunk};
pub use models::{LlmGatewayResponse, LlmMessage, LlmToolCall, MessageRole};
pub use tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
