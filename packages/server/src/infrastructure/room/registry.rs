//! Rooms and their members.
//!
//! ## 設計ノート
//!
//! ルームは `Client` の `Arc` を保持しますが、所有者は Connection Registry
//! です。ティアダウンでレジストリから外れたクライアントは送信ループを
//! 失っているため、ルームに残っていても配信先にはなりません。
//! ブロードキャストはそのルームのロックだけを保持し、ソケットへは書き込まず
//! 各クライアントのチャネルに積むだけです。

use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::{
    domain::{Command, ConversationId, CorrelationId, Frame, UserId},
    infrastructure::connection::{Client, ConnectionRegistry},
};

pub struct Room {
    id: ConversationId,
    members: Mutex<Vec<Arc<Client>>>,
}

impl Room {
    fn new(id: ConversationId) -> Self {
        Self {
            id,
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    /// Adds the client. A stale client of the same user (one that was
    /// replaced after its last connection closed) is swapped out.
    async fn add(&self, client: Arc<Client>) -> bool {
        let mut members = self.members.lock().await;
        match members.iter_mut().find(|m| m.id() == client.id()) {
            Some(existing) if Arc::ptr_eq(existing, &client) => false,
            Some(existing) => {
                *existing = client;
                true
            }
            None => {
                members.push(client);
                true
            }
        }
    }

    async fn remove(&self, user: UserId) -> bool {
        let mut members = self.members.lock().await;
        let before = members.len();
        members.retain(|m| m.id() != user);
        members.len() != before
    }

    async fn remove_client(&self, client: &Arc<Client>) -> bool {
        let mut members = self.members.lock().await;
        let before = members.len();
        members.retain(|m| !Arc::ptr_eq(m, client));
        members.len() != before
    }

    async fn broadcast(&self, frame: &Frame) -> usize {
        let members = self.members.lock().await;
        members
            .iter()
            .filter(|member| member.push(frame.clone()))
            .count()
    }

    pub async fn member_ids(&self) -> Vec<UserId> {
        self.members.lock().await.iter().map(|m| m.id()).collect()
    }
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<ConversationId, Arc<Room>>>,
    connections: Arc<ConnectionRegistry>,
}

impl RoomRegistry {
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            connections,
        }
    }

    /// Creates the room if it does not exist yet and joins `initial_member`
    /// when that user is connected.
    pub async fn create_room(&self, conversation: ConversationId, initial_member: Option<UserId>) {
        {
            let mut rooms = self.rooms.write().await;
            if !rooms.contains_key(&conversation) {
                rooms.insert(conversation, Arc::new(Room::new(conversation)));
                tracing::debug!("Room {} created", conversation);
            }
        }

        if let Some(user) = initial_member {
            self.join(conversation, user).await;
        }
    }

    pub async fn delete_room(&self, conversation: ConversationId) -> bool {
        let removed = self.rooms.write().await.remove(&conversation).is_some();
        if removed {
            tracing::debug!("Room {} deleted", conversation);
        }
        removed
    }

    /// Adds the user's live client to the room. Missing room or missing
    /// client is a no-op; joining twice keeps a single membership.
    pub async fn join(&self, conversation: ConversationId, user: UserId) -> bool {
        let Some(room) = self.room(conversation).await else {
            tracing::debug!("Join of user {} skipped: room {} does not exist", user, conversation);
            return false;
        };
        let Some(client) = self.connections.get(user).await else {
            tracing::debug!("Join of room {} skipped: user {} is not connected", conversation, user);
            return false;
        };
        room.add(client).await
    }

    pub async fn join_client(&self, conversation: ConversationId, client: Arc<Client>) -> bool {
        match self.room(conversation).await {
            Some(room) => room.add(client).await,
            None => false,
        }
    }

    pub async fn leave(&self, conversation: ConversationId, user: UserId) -> bool {
        match self.room(conversation).await {
            Some(room) => room.remove(user).await,
            None => false,
        }
    }

    /// Removes the user from every room and returns the rooms it was in.
    pub async fn leave_all(&self, user: UserId) -> Vec<ConversationId> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut left = Vec::new();
        for room in rooms {
            if room.remove(user).await {
                left.push(room.id());
            }
        }
        left
    }

    /// Removes this client instance from every room, leaving a newer client
    /// of the same user in place. Returns the rooms it was in.
    pub async fn leave_all_client(&self, client: &Arc<Client>) -> Vec<ConversationId> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();
        let mut left = Vec::new();
        for room in rooms {
            if room.remove_client(client).await {
                left.push(room.id());
            }
        }
        left
    }

    /// Pushes one frame to every member's channel. Returns how many members
    /// accepted it.
    pub async fn broadcast(
        &self,
        conversation: ConversationId,
        payload: Value,
        command: Command,
        correlation_id: CorrelationId,
    ) -> usize {
        let Some(room) = self.room(conversation).await else {
            tracing::warn!(
                "Broadcast of '{}' to missing room {} dropped",
                command.resource,
                conversation
            );
            return 0;
        };

        let frame = Frame::new(command, conversation, correlation_id, payload);
        let delivered = room.broadcast(&frame).await;
        tracing::debug!(
            "Broadcast '{}' to room {} reached {} member(s)",
            frame.command.resource,
            conversation,
            delivered
        );
        delivered
    }

    pub async fn room_ids(&self) -> Vec<ConversationId> {
        let mut ids: Vec<_> = self.rooms.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn members(&self, conversation: ConversationId) -> Vec<UserId> {
        match self.room(conversation).await {
            Some(room) => room.member_ids().await,
            None => Vec::new(),
        }
    }

    async fn room(&self, conversation: ConversationId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(&conversation).cloned()
    }
}
