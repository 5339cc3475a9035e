//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//! 失敗はコアにとって不透明なエラーとして扱われます。

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use super::{
    ApiError, CodeMessage, ConversationId, MediaMessage, MessageHeader, MessageId, TextMessage,
    UserId,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::ResourceDoesNotExist,
            other => ApiError::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// Message Repository trait
///
/// メッセージの保存と、ライブ編集で使うコードメッセージの更新を扱う。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn store_text_message(
        &self,
        conversation: ConversationId,
        author: UserId,
        message: &TextMessage,
    ) -> Result<MessageId, RepositoryError>;

    async fn store_code_message(
        &self,
        conversation: ConversationId,
        author: UserId,
        message: &CodeMessage,
    ) -> Result<MessageId, RepositoryError>;

    async fn store_media_message(
        &self,
        conversation: ConversationId,
        author: UserId,
        message: &MediaMessage,
    ) -> Result<MessageId, RepositoryError>;

    /// メッセージ本文を除いたヘッダーを取得（型チェック用）
    async fn find_message_header(
        &self,
        conversation: ConversationId,
        message: MessageId,
    ) -> Result<MessageHeader, RepositoryError>;

    async fn find_code_message(
        &self,
        conversation: ConversationId,
        message: MessageId,
    ) -> Result<CodeMessage, RepositoryError>;

    async fn update_code(
        &self,
        message: MessageId,
        code: &str,
        title: &str,
        language: &str,
    ) -> Result<(), RepositoryError>;

    /// ライブ編集ロックの所有者を更新（None で解除）
    async fn set_lock_owner(
        &self,
        message: MessageId,
        owner: Option<UserId>,
    ) -> Result<(), RepositoryError>;

    /// 会話内のメッセージをすべて既読にする
    async fn set_read_flags(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<(), RepositoryError>;
}

/// Conversation Repository trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, RepositoryError>;

    async fn list_conversations_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<Conversation>, RepositoryError>;

    async fn is_member(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<bool, RepositoryError>;

    async fn is_admin(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<bool, RepositoryError>;

    /// 会話を作成する。作成者は管理者として参加する。
    async fn create_conversation(
        &self,
        owner: UserId,
        title: &str,
        members: &[UserId],
    ) -> Result<Conversation, RepositoryError>;

    async fn delete_conversation(&self, conversation: ConversationId)
    -> Result<(), RepositoryError>;
}

/// User Repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<User, RepositoryError>;

    /// 資格情報が正しければユーザーを返す
    async fn verify_credentials(
        &self,
        name: &str,
        password: &str,
    ) -> Result<Option<User>, RepositoryError>;

    async fn update_online_timestamp(&self, user: UserId) -> Result<(), RepositoryError>;
}
