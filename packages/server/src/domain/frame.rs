//! The envelope every websocket message travels in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiError, Command, ConversationId, CorrelationId};

/// Source id carried by error frames.
pub const ERROR_SOURCE: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub command: Command,
    #[serde(default)]
    pub source: i64,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    pub fn new(
        command: Command,
        source: ConversationId,
        correlation_id: CorrelationId,
        payload: Value,
    ) -> Self {
        Self {
            command,
            source: source.value(),
            id: correlation_id.value(),
            payload,
        }
    }

    /// Error frame answering the request with the given correlation id.
    pub fn error(err: &ApiError, correlation_id: CorrelationId) -> Self {
        Self {
            command: Command::error(),
            source: ERROR_SOURCE,
            id: correlation_id.value(),
            payload: serde_json::to_value(err.to_body()).unwrap_or(Value::Null),
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        CorrelationId::new(self.id)
    }

    pub fn source(&self) -> ConversationId {
        ConversationId::new(self.source)
    }
}
