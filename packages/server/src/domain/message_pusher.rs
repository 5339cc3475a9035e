//! MessagePusher trait
//!
//! UseCase 層がクライアントへメッセージを届けるためのインターフェース。
//! 実体はルームレジストリと接続レジストリの上に Infrastructure 層が実装します。

use async_trait::async_trait;
use serde_json::Value;

use super::{ConversationId, RequestContext, UserId};

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 会話のメンバー全員に配信する。配信できたクライアント数を返す。
    async fn broadcast_to_room(
        &self,
        conversation: ConversationId,
        ctx: &RequestContext,
        payload: Value,
    ) -> usize;

    /// 特定ユーザーの全接続に配信する（ベストエフォート）
    async fn unicast(&self, user: UserId, ctx: &RequestContext, payload: Value) -> bool;
}
