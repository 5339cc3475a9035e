//! InMemory Message Repository 実装

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    CodeMessage, ConversationId, MediaMessage, Message, MessageHeader, MessageId,
    MessageRepository, RepositoryError, TextMessage, UserId,
};

struct StoredMessage {
    conversation: ConversationId,
    author: UserId,
    message: Message,
}

#[derive(Default)]
struct MessageTable {
    last_id: i64,
    messages: HashMap<MessageId, StoredMessage>,
    /// Messages each user has read.
    read_by: HashMap<UserId, HashSet<MessageId>>,
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    table: RwLock<MessageTable>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn store(
        &self,
        conversation: ConversationId,
        author: UserId,
        mut message: Message,
    ) -> Result<MessageId, RepositoryError> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = MessageId::new(table.last_id);
        message.base_mut().id = id;
        table.messages.insert(
            id,
            StoredMessage {
                conversation,
                author,
                message,
            },
        );
        Ok(id)
    }

    /// Messages of a conversation in insertion order.
    pub async fn conversation_messages(&self, conversation: ConversationId) -> Vec<Message> {
        let table = self.table.read().await;
        let mut messages: Vec<&StoredMessage> = table
            .messages
            .values()
            .filter(|m| m.conversation == conversation)
            .collect();
        messages.sort_by_key(|m| m.message.id());
        messages.into_iter().map(|m| m.message.clone()).collect()
    }

    pub async fn is_read_by(&self, user: UserId, message: MessageId) -> bool {
        self.table
            .read()
            .await
            .read_by
            .get(&user)
            .is_some_and(|read| read.contains(&message))
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn store_text_message(
        &self,
        conversation: ConversationId,
        author: UserId,
        message: &TextMessage,
    ) -> Result<MessageId, RepositoryError> {
        self.store(conversation, author, Message::Text(message.clone()))
            .await
    }

    async fn store_code_message(
        &self,
        conversation: ConversationId,
        author: UserId,
        message: &CodeMessage,
    ) -> Result<MessageId, RepositoryError> {
        let mut message = message.clone();
        message.locked_by = None;
        self.store(conversation, author, Message::Code(message)).await
    }

    async fn store_media_message(
        &self,
        conversation: ConversationId,
        author: UserId,
        message: &MediaMessage,
    ) -> Result<MessageId, RepositoryError> {
        self.store(conversation, author, Message::Media(message.clone()))
            .await
    }

    async fn find_message_header(
        &self,
        conversation: ConversationId,
        message: MessageId,
    ) -> Result<MessageHeader, RepositoryError> {
        let table = self.table.read().await;
        let stored = table
            .messages
            .get(&message)
            .filter(|m| m.conversation == conversation)
            .ok_or(RepositoryError::NotFound)?;
        let base = stored.message.base();
        Ok(MessageHeader {
            id: base.id,
            kind: base.kind,
            sentdate: base.sentdate,
            author: stored.author,
        })
    }

    async fn find_code_message(
        &self,
        conversation: ConversationId,
        message: MessageId,
    ) -> Result<CodeMessage, RepositoryError> {
        let table = self.table.read().await;
        match table.messages.get(&message) {
            Some(StoredMessage {
                conversation: c,
                message: Message::Code(code),
                ..
            }) if *c == conversation => Ok(code.clone()),
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn update_code(
        &self,
        message: MessageId,
        code: &str,
        title: &str,
        language: &str,
    ) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        let Some(StoredMessage {
            message: Message::Code(stored),
            ..
        }) = table.messages.get_mut(&message)
        else {
            return Err(RepositoryError::NotFound);
        };
        stored.code = code.to_string();
        stored.title = title.to_string();
        stored.language = language.to_string();
        Ok(())
    }

    async fn set_lock_owner(
        &self,
        message: MessageId,
        owner: Option<UserId>,
    ) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        let Some(StoredMessage {
            message: Message::Code(stored),
            ..
        }) = table.messages.get_mut(&message)
        else {
            return Err(RepositoryError::NotFound);
        };
        stored.locked_by = owner;
        Ok(())
    }

    async fn set_read_flags(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        let ids: Vec<MessageId> = table
            .messages
            .iter()
            .filter(|(_, m)| m.conversation == conversation)
            .map(|(id, _)| *id)
            .collect();
        table.read_by.entry(user).or_default().extend(ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageBase, MessageType};
    use chrono::Utc;

    fn code_message(code: &str) -> CodeMessage {
        CodeMessage {
            base: MessageBase {
                id: MessageId::default(),
                kind: MessageType::Code,
                sentdate: Utc::now(),
                provisionary_id: None,
                author: "alice".into(),
            },
            code: code.into(),
            language: "rust".into(),
            title: "main.rs".into(),
            locked_by: Some(UserId::new(9)),
        }
    }

    #[tokio::test]
    async fn test_stored_code_message_starts_unlocked_with_new_id() {
        // テスト項目: 保存したコードメッセージは新しい ID を持ち、ロックされていない
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();

        // when (操作):
        let id = repo
            .store_code_message(ConversationId::new(1), UserId::new(1), &code_message("x"))
            .await
            .unwrap();
        let stored = repo.find_code_message(ConversationId::new(1), id).await.unwrap();

        // then (期待する結果):
        assert_eq!(id, MessageId::new(1));
        assert_eq!(stored.base.id, id);
        assert_eq!(stored.locked_by, None);
    }

    #[tokio::test]
    async fn test_message_is_not_found_through_other_conversation() {
        // テスト項目: 別の会話 ID からはメッセージを参照できない
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();
        let id = repo
            .store_code_message(ConversationId::new(1), UserId::new(1), &code_message("x"))
            .await
            .unwrap();

        // when (操作):
        let header = repo.find_message_header(ConversationId::new(2), id).await;
        let code = repo.find_code_message(ConversationId::new(2), id).await;

        // then (期待する結果):
        assert!(matches!(header, Err(RepositoryError::NotFound)));
        assert!(matches!(code, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_set_read_flags_marks_conversation_messages() {
        // テスト項目: 既読フラグは指定した会話のメッセージにだけ付く
        // given (前提条件):
        let repo = InMemoryMessageRepository::new();
        let in_conv = repo
            .store_code_message(ConversationId::new(1), UserId::new(1), &code_message("a"))
            .await
            .unwrap();
        let elsewhere = repo
            .store_code_message(ConversationId::new(2), UserId::new(1), &code_message("b"))
            .await
            .unwrap();

        // when (操作):
        repo.set_read_flags(UserId::new(5), ConversationId::new(1))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(repo.is_read_by(UserId::new(5), in_conv).await);
        assert!(!repo.is_read_by(UserId::new(5), elsewhere).await);
    }
}
