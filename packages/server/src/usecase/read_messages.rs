//! UseCase: 既読処理

use std::sync::Arc;

use serde_json::Value;

use crate::{
    domain::{ApiError, ConversationRepository, MessageRepository, UserId},
    infrastructure::dto::websocket::ReadMessagesRequest,
};

use super::access::ensure_member;

/// 会話内のメッセージを既読にするユースケース
pub struct ReadMessagesUseCase {
    messages: Arc<dyn MessageRepository>,
    conversations: Arc<dyn ConversationRepository>,
}

impl ReadMessagesUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            messages,
            conversations,
        }
    }

    pub async fn execute(&self, user: UserId, payload: Value) -> Result<(), ApiError> {
        let request: ReadMessagesRequest = serde_json::from_value(payload)?;
        ensure_member(self.conversations.as_ref(), user, request.conversation_id).await?;
        self.messages
            .set_read_flags(user, request.conversation_id)
            .await?;
        Ok(())
    }
}
