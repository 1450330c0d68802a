//! Events a session delivers to its subscribers.
//!
//! Every turn produces zero or more deltas, messages and tool events, and ends
//! with exactly one terminal event: [`SessionEventData::SessionIdle`] on success
//! or [`SessionEventData::SessionError`] on failure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: SessionEventData,
}

impl SessionEvent {
    pub fn new(data: SessionEventData) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            data,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.data.event_type()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEventData {
    #[serde(rename = "assistant.message_delta")]
    AssistantMessageDelta { delta_content: String },

    #[serde(rename = "assistant.message")]
    AssistantMessage { content: String },

    #[serde(rename = "tool.execution_start")]
    ToolExecutionStart {
        tool_call_id: Option<String>,
        tool_name: String,
        arguments: HashMap<String, Value>,
    },

    #[serde(rename = "tool.execution_complete")]
    ToolExecutionComplete {
        tool_call_id: Option<String>,
        tool_name: String,
        success: bool,
        result: Value,
    },

    #[serde(rename = "session.error")]
    SessionError { message: String },

    #[serde(rename = "session.idle")]
    SessionIdle,
}

impl SessionEventData {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AssistantMessageDelta { .. } => "assistant.message_delta",
            Self::AssistantMessage { .. } => "assistant.message",
            Self::ToolExecutionStart { .. } => "tool.execution_start",
            Self::ToolExecutionComplete { .. } => "tool.execution_complete",
            Self::SessionError { .. } => "session.error",
            Self::SessionIdle => "session.idle",
        }
    }

    /// Whether this event ends the turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SessionIdle | Self::SessionError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_types() {
        let delta = SessionEventData::AssistantMessageDelta {
            delta_content: "Hi".to_string(),
        };
        assert_eq!(delta.event_type(), "assistant.message_delta");
        assert!(!delta.is_terminal());

        assert_eq!(SessionEventData::SessionIdle.event_type(), "session.idle");
        assert!(SessionEventData::SessionIdle.is_terminal());

        let error = SessionEventData::SessionError {
            message: "boom".to_string(),
        };
        assert!(error.is_terminal());
    }

    #[test]
    fn test_events_get_unique_ids() {
        let a = SessionEvent::new(SessionEventData::SessionIdle);
        let b = SessionEvent::new(SessionEventData::SessionIdle);
        assert_ne!(a.id, b.id);
        assert!(a.timestamp <= b.timestamp);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = SessionEvent::new(SessionEventData::AssistantMessageDelta {
            delta_content: "Hel".to_string(),
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "assistant.message_delta");
        assert_eq!(value["data"]["delta_content"], "Hel");
        assert!(value["id"].is_string());
        assert!(value["timestamp"].is_string());

        let idle = serde_json::to_value(SessionEvent::new(SessionEventData::SessionIdle)).unwrap();
        assert_eq!(idle["type"], "session.idle");
    }

    #[test]
    fn test_tool_event_serialization() {
        let mut arguments = HashMap::new();
        arguments.insert("city".to_string(), json!("Anchorage"));
        let event = SessionEventData::ToolExecutionStart {
            tool_call_id: Some("call_1".to_string()),
            tool_name: "get_weather".to_string(),
            arguments,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tool.execution_start");
        assert_eq!(value["data"]["tool_name"], "get_weather");
        assert_eq!(value["data"]["arguments"]["city"], "Anchorage");
    }
}
