//! UseCase: クライアント接続処理
//!
//! ## 責務
//!
//! - 物理接続を Connection Registry に登録する
//! - ユーザーの最初の接続であれば、所属するすべての会話のルームに参加させ、
//!   オンライン状態を通知し、オンライン時刻を更新する

use std::sync::Arc;

use crate::{
    domain::{ConversationRepository, MessagePusher, UserId, UserRepository},
    infrastructure::{
        connection::{Client, CloseSignal, Connection, ConnectionRegistry},
        room::RoomRegistry,
    },
};

use super::{error::ConnectError, presence::notify_online_state};

/// クライアント接続のユースケース
pub struct ConnectClientUseCase {
    connections: Arc<ConnectionRegistry>,
    rooms: Arc<RoomRegistry>,
    conversations: Arc<dyn ConversationRepository>,
    users: Arc<dyn UserRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl ConnectClientUseCase {
    pub fn new(
        connections: Arc<ConnectionRegistry>,
        rooms: Arc<RoomRegistry>,
        conversations: Arc<dyn ConversationRepository>,
        users: Arc<dyn UserRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            connections,
            rooms,
            conversations,
            users,
            message_pusher,
        }
    }

    /// クライアント接続を実行
    ///
    /// 会話一覧の取得に失敗した場合は登録を取り消してエラーを返す。
    pub async fn execute(
        &self,
        user: UserId,
        connection: Connection,
    ) -> Result<Arc<Client>, ConnectError> {
        let connection_id = connection.id();
        let (client, created) = self.connections.connect(user, connection).await;
        if !created {
            tracing::debug!("User {} opened another connection", user);
            return Ok(client);
        }

        // 1. 所属する会話を取得
        let conversations = match self.conversations.list_conversations_for_user(user).await {
            Ok(conversations) => conversations,
            Err(source) => {
                if self.connections.detach(&client, connection_id).await {
                    self.connections.remove(&client).await;
                    client.signal_close(CloseSignal::LastConnectionGone);
                }
                return Err(ConnectError::ConversationLookup { user, source });
            }
        };

        // 2. 各会話のルームに参加
        let mut joined = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            self.rooms.create_room(conversation.id, None).await;
            self.rooms.join_client(conversation.id, client.clone()).await;
            joined.push(conversation.id);
        }

        // 3. オンライン状態を通知
        notify_online_state(self.message_pusher.as_ref(), &joined, user, true).await;

        // 4. オンライン時刻を更新（失敗しても接続は維持）
        if let Err(e) = self.users.update_online_timestamp(user).await {
            tracing::warn!("Failed to update online timestamp of user {}: {}", user, e);
        }

        tracing::info!("User {} connected and joined {} room(s)", user, joined.len());
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConversationId, RepositoryError, repository::MockConversationRepository},
        infrastructure::connection::client::test_support::{RecordingSink, connection_with},
        usecase::test_support::{ALICE, CONVERSATION, Fixture, Target},
    };

    struct Setup {
        fixture: Fixture,
        connections: Arc<ConnectionRegistry>,
        rooms: Arc<RoomRegistry>,
    }

    async fn setup() -> Setup {
        let fixture = Fixture::new().await;
        let connections = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomRegistry::new(connections.clone()));
        Setup {
            fixture,
            connections,
            rooms,
        }
    }

    fn usecase(setup: &Setup, conversations: Arc<dyn ConversationRepository>) -> ConnectClientUseCase {
        ConnectClientUseCase::new(
            setup.connections.clone(),
            setup.rooms.clone(),
            conversations,
            setup.fixture.users.clone(),
            setup.fixture.pusher.clone(),
        )
    }

    #[tokio::test]
    async fn test_first_connection_joins_rooms_and_announces_presence() {
        // テスト項目: 最初の接続でルームに参加し、オンライン通知が送られる
        // given (前提条件):
        let setup = setup().await;
        let usecase = usecase(&setup, setup.fixture.conversations.clone());
        let sink = Arc::new(RecordingSink::default());

        // when (操作):
        usecase.execute(ALICE, connection_with(&sink)).await.unwrap();

        // then (期待する結果):
        assert_eq!(setup.rooms.members(CONVERSATION).await, vec![ALICE]);
        let pushed = setup.fixture.pusher.pushed();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].target, Target::Room(CONVERSATION));
        assert_eq!(pushed[0].ctx.command.resource, "member/onlinestate");
        assert_eq!(pushed[0].payload, serde_json::json!({"userId": 42, "newState": true}));
        assert!(setup.fixture.users.last_online(ALICE).await.is_some());
    }

    #[tokio::test]
    async fn test_second_connection_does_not_announce_again() {
        // テスト項目: 2 本目の接続ではルーム参加や通知を繰り返さない
        // given (前提条件):
        let setup = setup().await;
        let usecase = usecase(&setup, setup.fixture.conversations.clone());
        usecase
            .execute(ALICE, connection_with(&Arc::new(RecordingSink::default())))
            .await
            .unwrap();

        // when (操作):
        let client = usecase
            .execute(ALICE, connection_with(&Arc::new(RecordingSink::default())))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(client.connection_count().await, 2);
        assert_eq!(setup.fixture.pusher.pushed().len(), 1);
    }

    #[tokio::test]
    async fn test_conversation_lookup_failure_rolls_back_registration() {
        // テスト項目: 会話一覧の取得に失敗すると登録が取り消される
        // given (前提条件):
        let setup = setup().await;
        let mut conversations = MockConversationRepository::new();
        conversations
            .expect_list_conversations_for_user()
            .returning(|_| Err(RepositoryError::Backend("timeout".into())));
        let usecase = usecase(&setup, Arc::new(conversations));

        // when (操作):
        let result = usecase
            .execute(ALICE, connection_with(&Arc::new(RecordingSink::default())))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::ConversationLookup { .. })));
        assert!(!setup.connections.is_connected(ALICE).await);
        assert!(setup.rooms.room_ids().await.is_empty());
        assert_eq!(setup.rooms.members(ConversationId::new(7)).await, vec![]);
    }
}
