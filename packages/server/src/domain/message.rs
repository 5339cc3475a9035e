//! Message payloads.
//!
//! Messages are a tagged union discriminated by the integer `type` field.
//! Decoding happens in two phases: the tag is read first, then the full
//! variant is parsed, so an unknown tag can be reported on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiError, MessageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum MessageType {
    Text,
    Code,
    Media,
}

impl TryFrom<i32> for MessageType {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Text),
            1 => Ok(MessageType::Code),
            2 => Ok(MessageType::Media),
            other => Err(format!("unknown message type {other}")),
        }
    }
}

impl From<MessageType> for i32 {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Text => 0,
            MessageType::Code => 1,
            MessageType::Media => 2,
        }
    }
}

/// Fields common to every message variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBase {
    #[serde(default)]
    pub id: MessageId,
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default = "Utc::now")]
    pub sentdate: DateTime<Utc>,
    #[serde(
        rename = "provisionaryId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provisionary_id: Option<i64>,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    #[serde(flatten)]
    pub base: MessageBase,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMessage {
    #[serde(flatten)]
    pub base: MessageBase,
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "lockedBy", default, with = "lock_owner")]
    pub locked_by: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    pub id: i64,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub name: String,
    #[serde(default)]
    pub meta: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMessage {
    #[serde(flatten)]
    pub base: MessageBase,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub files: Vec<MediaObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Text(TextMessage),
    Code(CodeMessage),
    Media(MediaMessage),
}

#[derive(Deserialize)]
struct TypeTag {
    #[serde(rename = "type")]
    kind: i32,
}

impl Message {
    /// Two-phase decode of a message payload.
    pub fn from_json(payload: Value) -> Result<Self, ApiError> {
        let tag = TypeTag::deserialize(&payload)?;
        let kind =
            MessageType::try_from(tag.kind).map_err(|_| ApiError::MessageTypeNotImplemented)?;

        let message = match kind {
            MessageType::Text => Message::Text(serde_json::from_value(payload)?),
            MessageType::Code => Message::Code(serde_json::from_value(payload)?),
            MessageType::Media => Message::Media(serde_json::from_value(payload)?),
        };
        Ok(message)
    }

    pub fn kind(&self) -> MessageType {
        self.base().kind
    }

    pub fn id(&self) -> MessageId {
        self.base().id
    }

    pub fn base(&self) -> &MessageBase {
        match self {
            Message::Text(m) => &m.base,
            Message::Code(m) => &m.base,
            Message::Media(m) => &m.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut MessageBase {
        match self {
            Message::Text(m) => &mut m.base,
            Message::Code(m) => &mut m.base,
            Message::Media(m) => &mut m.base,
        }
    }
}

/// Stored message without its content, as returned by the repository for
/// type checks.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHeader {
    pub id: MessageId,
    pub kind: MessageType,
    pub sentdate: DateTime<Utc>,
    pub author: UserId,
}

/// `lockedBy` travels as a plain user id where 0 means unlocked.
pub(crate) mod lock_owner {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::UserId;

    pub fn serialize<S: Serializer>(owner: &Option<UserId>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(owner.map_or(0, |id| id.value()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<UserId>, D::Error> {
        let raw = Option::<i64>::deserialize(deserializer)?;
        Ok(raw.filter(|id| *id != 0).map(UserId::new))
    }
}
