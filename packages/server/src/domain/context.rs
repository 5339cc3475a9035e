//! Per-request metadata handed to endpoint handlers.

use super::{Command, ConversationId, CorrelationId};

/// The command, correlation id and source conversation of the frame being
/// handled. Broadcasts caused by the request reuse its correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub command: Command,
    pub correlation_id: Option<CorrelationId>,
    pub source: ConversationId,
}

impl RequestContext {
    pub fn new(command: Command, correlation_id: CorrelationId, source: ConversationId) -> Self {
        Self {
            command,
            correlation_id: Some(correlation_id),
            source,
        }
    }

    /// Context for a push the server initiates on its own (presence updates).
    pub fn server_push(command: Command, source: ConversationId) -> Self {
        Self {
            command,
            correlation_id: None,
            source,
        }
    }

    /// The correlation id to stamp on outgoing frames.
    pub fn outgoing_id(&self) -> CorrelationId {
        self.correlation_id.unwrap_or_else(CorrelationId::random)
    }
}
