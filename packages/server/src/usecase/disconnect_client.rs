//! UseCase: クライアント切断処理
//!
//! 物理接続を外し、それが最後の接続であればクライアントを片付ける
//! （レジストリから削除、全ルームから退出、オフライン通知、送信ループ停止）。
//! 片付けは最後の接続が外れたときの 1 回だけ実行される。

use std::sync::Arc;

use crate::{
    domain::MessagePusher,
    infrastructure::{
        connection::{Client, CloseSignal, ConnectionId, ConnectionRegistry},
        room::RoomRegistry,
    },
};

use super::presence::notify_online_state;

pub struct DisconnectClientUseCase {
    connections: Arc<ConnectionRegistry>,
    rooms: Arc<RoomRegistry>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectClientUseCase {
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        rooms: Arc<RoomRegistry>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            rooms,
            message_pusher,
        }
    }

    /// 切断を実行。クライアントを片付けた場合に true を返す。
    pub async fn execute(&self, client: &Arc<Client>, connection: ConnectionId) -> bool {
        let user = client.id();
        if !self.connections.detach(client, connection).await {
            tracing::debug!("User {} closed one of its connections", user);
            return false;
        }

        self.connections.remove(client).await;
        let left = self.rooms.leave_all_client(client).await;
        client.signal_close(CloseSignal::LastConnectionGone);

        // 既に再接続している場合はオフラインにしない
        if !self.connections.is_connected(user).await {
            notify_online_state(self.message_pusher.as_ref(), &left, user, false).await;
        }

        tracing::info!("User {} disconnected", user);
        true
    }
}
