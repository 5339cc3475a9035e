//! UseCase: 会話とルームのライフサイクル
//!
//! 会話の作成・削除をリポジトリに反映し、対応するルームを作成・削除する。
//! 起動時には既存のすべての会話に対してルームを用意する。

use std::sync::Arc;

use crate::{
    domain::{ApiError, Conversation, ConversationId, ConversationRepository, RepositoryError, UserId},
    infrastructure::room::RoomRegistry,
};

pub struct ConversationRoomsUseCase {
    conversations: Arc<dyn ConversationRepository>,
    rooms: Arc<RoomRegistry>,
}

impl ConversationRoomsUseCase {
    pub fn new(conversations: Arc<dyn ConversationRepository>, rooms: Arc<RoomRegistry>) -> Self {
        Self {
            conversations,
            rooms,
        }
    }

    /// 既存の会話ごとにルームを作成する。作成したルーム数を返す。
    pub async fn restore_rooms(&self) -> Result<usize, RepositoryError> {
        let conversations = self.conversations.list_conversations().await?;
        for conversation in &conversations {
            self.rooms.create_room(conversation.id, None).await;
        }
        tracing::info!("Restored {} room(s)", conversations.len());
        Ok(conversations.len())
    }

    /// 会話を作成し、作成者と接続中の初期メンバーをルームに参加させる
    pub async fn create_conversation(
        &self,
        owner: UserId,
        title: &str,
        members: &[UserId],
    ) -> Result<Conversation, ApiError> {
        if title.trim().is_empty() {
            return Err(ApiError::InvalidValue("title".into()));
        }

        let conversation = self
            .conversations
            .create_conversation(owner, title, members)
            .await?;

        self.rooms.create_room(conversation.id, Some(owner)).await;
        for member in members {
            self.rooms.join(conversation.id, *member).await;
        }

        tracing::info!("User {} created conversation {}", owner, conversation.id);
        Ok(conversation)
    }

    /// 会話を削除する（管理者のみ）
    pub async fn delete_conversation(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<(), ApiError> {
        if !self.conversations.is_member(user, conversation).await? {
            return Err(ApiError::ConversationDoesNotExist);
        }
        if !self.conversations.is_admin(user, conversation).await? {
            return Err(ApiError::AccessDenied);
        }

        self.conversations.delete_conversation(conversation).await?;
        self.rooms.delete_room(conversation).await;

        tracing::info!("User {} deleted conversation {}", user, conversation);
        Ok(())
    }
}
