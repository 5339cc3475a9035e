//! Payloads of websocket frames, in and out.

use serde::{Deserialize, Serialize};

use crate::domain::{ConversationId, MessageId, UserId, message::lock_owner};

/// `message/read` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMessagesRequest {
    pub conversation_id: ConversationId,
}

/// `livesession/code/start` and `livesession/code/stop` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSessionRequest {
    pub message_id: MessageId,
}

/// `message` PATCH and `livecoding` PATCH request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePatchRequest {
    pub message_id: MessageId,
    /// Empty when only the title or language changes.
    #[serde(default)]
    pub patch: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
}

/// Broadcast when an edit lock is taken or released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockChangeNotification {
    pub message_id: MessageId,
    #[serde(with = "lock_owner")]
    pub new_owner: Option<UserId>,
}

/// Broadcast after a saved edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEditedNotification {
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypingNotification {
    pub typist: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStateNotification {
    pub user_id: UserId,
    pub new_state: bool,
}
