//! Test doubles shared by the use case tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::{
        Command, ConversationId, CorrelationId, MessagePusher, Method, RequestContext, UserId,
    },
    infrastructure::repository::inmemory::{
        InMemoryConversationRepository, InMemoryMessageRepository, InMemoryUserRepository,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Room(ConversationId),
    User(UserId),
}

#[derive(Debug, Clone)]
pub struct Pushed {
    pub target: Target,
    pub ctx: RequestContext,
    pub payload: Value,
}

/// MessagePusher that records instead of delivering.
#[derive(Default)]
pub struct RecordingPusher {
    pushed: Mutex<Vec<Pushed>>,
}

impl RecordingPusher {
    pub fn pushed(&self) -> Vec<Pushed> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePusher for RecordingPusher {
    async fn broadcast_to_room(
        &self,
        conversation: ConversationId,
        ctx: &RequestContext,
        payload: Value,
    ) -> usize {
        self.pushed.lock().unwrap().push(Pushed {
            target: Target::Room(conversation),
            ctx: ctx.clone(),
            payload,
        });
        1
    }

    async fn unicast(&self, user: UserId, ctx: &RequestContext, payload: Value) -> bool {
        self.pushed.lock().unwrap().push(Pushed {
            target: Target::User(user),
            ctx: ctx.clone(),
            payload,
        });
        true
    }
}

pub fn request(resource: &str, method: Method, id: i64, source: i64) -> RequestContext {
    RequestContext::new(
        Command::new(resource, method),
        CorrelationId::new(id),
        ConversationId::new(source),
    )
}

/// Conversation 7 with members alice (42, admin) and bob (43); carol (44)
/// exists but is not a member.
pub struct Fixture {
    pub conversations: Arc<InMemoryConversationRepository>,
    pub messages: Arc<InMemoryMessageRepository>,
    pub users: Arc<InMemoryUserRepository>,
    pub pusher: Arc<RecordingPusher>,
}

pub const CONVERSATION: ConversationId = ConversationId::new(7);
pub const ALICE: UserId = UserId::new(42);
pub const BOB: UserId = UserId::new(43);
pub const CAROL: UserId = UserId::new(44);

impl Fixture {
    pub async fn new() -> Self {
        let conversations = Arc::new(InMemoryConversationRepository::new());
        conversations
            .insert(CONVERSATION, "pairing", &[ALICE, BOB], &[ALICE])
            .await;
        let users = Arc::new(InMemoryUserRepository::new());
        users.add_user(ALICE, "alice", "alice-pw").await.unwrap();
        users.add_user(BOB, "bob", "bob-pw").await.unwrap();
        users.add_user(CAROL, "carol", "carol-pw").await.unwrap();
        Self {
            conversations,
            messages: Arc::new(InMemoryMessageRepository::new()),
            users,
            pusher: Arc::new(RecordingPusher::default()),
        }
    }
}
