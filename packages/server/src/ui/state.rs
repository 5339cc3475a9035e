//! Shared application state.

use std::sync::Arc;

use crate::{
    infrastructure::{connection::ConnectionRegistry, rate_limit::RateLimiter, room::RoomRegistry},
    usecase::{
        ConnectClientUseCase, ConversationRoomsUseCase, DisconnectClientUseCase,
        EndpointDispatcher, SessionUseCase,
    },
};

pub struct AppState {
    /// SessionUseCase（ログイン・トークン検証・ログアウト）
    pub session_usecase: Arc<SessionUseCase>,
    /// ConnectClientUseCase（クライアント接続のユースケース）
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    /// DisconnectClientUseCase（クライアント切断のユースケース）
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    /// ConversationRoomsUseCase（会話とルームの作成・削除）
    pub conversation_rooms_usecase: Arc<ConversationRoomsUseCase>,
    /// WebSocket フレームのルーティング
    pub dispatcher: Arc<EndpointDispatcher>,
    /// HTTP ルート共通のレート制限
    pub http_limiter: Arc<RateLimiter>,
    pub connections: Arc<ConnectionRegistry>,
    pub rooms: Arc<RoomRegistry>,
}
