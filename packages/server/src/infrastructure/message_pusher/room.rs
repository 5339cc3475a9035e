//! Room Registry を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - ルーム宛てのブロードキャストを Room Registry に委譲
//! - ユーザー宛てのユニキャストを Connection Registry に委譲
//! - リクエストの相関 ID をフレームに引き継ぐ（サーバー起点の送信は乱数 ID）

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::{ConversationId, Frame, MessagePusher, RequestContext, UserId},
    infrastructure::{connection::ConnectionRegistry, room::RoomRegistry},
};

pub struct RoomMessagePusher {
    rooms: Arc<RoomRegistry>,
    connections: Arc<ConnectionRegistry>,
}

impl RoomMessagePusher {
    pub fn new(rooms: Arc<RoomRegistry>, connections: Arc<ConnectionRegistry>) -> Self {
        Self { rooms, connections }
    }
}

#[async_trait]
impl MessagePusher for RoomMessagePusher {
    async fn broadcast_to_room(
        &self,
        conversation: ConversationId,
        ctx: &RequestContext,
        payload: Value,
    ) -> usize {
        self.rooms
            .broadcast(conversation, payload, ctx.command.clone(), ctx.outgoing_id())
            .await
    }

    async fn unicast(&self, user: UserId, ctx: &RequestContext, payload: Value) -> bool {
        let frame = Frame::new(ctx.command.clone(), ctx.source, ctx.outgoing_id(), payload);
        let sent = self.connections.send(user, frame).await;
        if !sent {
            tracing::debug!(
                "Unicast of '{}' to user {} dropped: not connected",
                ctx.command.resource,
                user
            );
        }
        sent
    }
}
