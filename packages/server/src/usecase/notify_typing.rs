//! UseCase: 入力中通知

use std::sync::Arc;

use crate::{
    domain::{ApiError, ConversationRepository, MessagePusher, RequestContext, UserId},
    infrastructure::dto::websocket::TypingNotification,
};

use super::access::ensure_member;

pub struct NotifyTypingUseCase {
    conversations: Arc<dyn ConversationRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl NotifyTypingUseCase {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            conversations,
            message_pusher,
        }
    }

    /// フレームの `source` の会話に `{typist}` をブロードキャストする
    pub async fn execute(&self, ctx: &RequestContext, user: UserId) -> Result<(), ApiError> {
        ensure_member(self.conversations.as_ref(), user, ctx.source).await?;
        let payload = serde_json::to_value(TypingNotification { typist: user })?;
        self.message_pusher
            .broadcast_to_room(ctx.source, ctx, payload)
            .await;
        Ok(())
    }
}
