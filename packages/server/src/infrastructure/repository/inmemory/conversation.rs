//! InMemory Conversation Repository 実装

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Conversation, ConversationId, ConversationRepository, RepositoryError, UserId};

#[derive(Default)]
struct ConversationTable {
    last_id: i64,
    conversations: BTreeMap<ConversationId, Conversation>,
    /// Members of each conversation and whether they are admins.
    members: HashMap<ConversationId, HashMap<UserId, bool>>,
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    table: RwLock<ConversationTable>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a conversation with a fixed id, as used for seeding.
    pub async fn insert(
        &self,
        id: ConversationId,
        title: &str,
        members: &[UserId],
        admins: &[UserId],
    ) {
        let mut table = self.table.write().await;
        table.last_id = table.last_id.max(id.value());
        table.conversations.insert(
            id,
            Conversation {
                id,
                title: title.to_string(),
            },
        );
        let entry = table.members.entry(id).or_default();
        for member in members {
            entry.insert(*member, admins.contains(member));
        }
        for admin in admins {
            entry.insert(*admin, true);
        }
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, RepositoryError> {
        Ok(self.table.read().await.conversations.values().cloned().collect())
    }

    async fn list_conversations_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .conversations
            .values()
            .filter(|c| {
                table
                    .members
                    .get(&c.id)
                    .is_some_and(|members| members.contains_key(&user))
            })
            .cloned()
            .collect())
    }

    async fn is_member(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .table
            .read()
            .await
            .members
            .get(&conversation)
            .is_some_and(|members| members.contains_key(&user)))
    }

    async fn is_admin(
        &self,
        user: UserId,
        conversation: ConversationId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .table
            .read()
            .await
            .members
            .get(&conversation)
            .and_then(|members| members.get(&user).copied())
            .unwrap_or(false))
    }

    async fn create_conversation(
        &self,
        owner: UserId,
        title: &str,
        members: &[UserId],
    ) -> Result<Conversation, RepositoryError> {
        let id = {
            let mut table = self.table.write().await;
            table.last_id += 1;
            ConversationId::new(table.last_id)
        };
        self.insert(id, title, members, &[owner]).await;
        Ok(Conversation {
            id,
            title: title.to_string(),
        })
    }

    async fn delete_conversation(
        &self,
        conversation: ConversationId,
    ) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        if table.conversations.remove(&conversation).is_none() {
            return Err(RepositoryError::NotFound);
        }
        table.members.remove(&conversation);
        Ok(())
    }
}
