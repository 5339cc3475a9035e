//! Wires the registries, stores, use cases and dispatcher into an `AppState`.

use std::{sync::Arc, time::Duration};

use codechat_shared::time::{Clock, SystemClock};
use rand::RngCore;
use thiserror::Error;

use crate::{
    config::Config,
    domain::RepositoryError,
    infrastructure::{
        connection::ConnectionRegistry,
        message_pusher::RoomMessagePusher,
        rate_limit::{RateLimitConfigError, RateLimiter},
        repository::inmemory::{
            InMemoryConversationRepository, InMemoryMessageRepository, InMemoryTokenListStore,
            InMemoryUserRepository, MemoryQuotaStore,
        },
        room::RoomRegistry,
        session::SessionManager,
    },
    ui::AppState,
    usecase::{
        ConnectClientUseCase, ConversationRoomsUseCase, DisconnectClientUseCase,
        LiveEditUseCase, NotifyTypingUseCase, ReadMessagesUseCase, SendMessageUseCase,
        SessionUseCase,
        endpoints::{SocketUseCases, build_dispatcher},
    },
};

const WEBSOCKET_LIMIT_PREFIX: &str = "ws__";
const HTTP_LIMIT_PREFIX: &str = "http__";
const QUOTA_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to seed repositories: {0}")]
    Seed(#[source] RepositoryError),
    #[error("failed to restore rooms: {0}")]
    RestoreRooms(#[source] RepositoryError),
    #[error("invalid rate limit: {0}")]
    RateLimit(#[from] RateLimitConfigError),
}

fn session_secret(config: &Config) -> Vec<u8> {
    match &config.session.secret {
        Some(secret) if !secret.is_empty() => secret.as_bytes().to_vec(),
        _ => {
            tracing::warn!(
                "No session secret configured; using a random one. Tokens will not survive a restart."
            );
            let mut secret = vec![0u8; 32];
            rand::thread_rng().fill_bytes(&mut secret);
            secret
        }
    }
}

async fn seed(
    config: &Config,
    users: &InMemoryUserRepository,
    conversations: &InMemoryConversationRepository,
) -> Result<(), RepositoryError> {
    for user in &config.seed.users {
        users.add_user(user.id, &user.name, &user.password).await?;
    }
    for conversation in &config.seed.conversations {
        conversations
            .insert(
                conversation.id,
                &conversation.title,
                &conversation.members,
                &conversation.admins,
            )
            .await;
    }
    tracing::info!(
        "Seeded {} user(s) and {} conversation(s)",
        config.seed.users.len(),
        config.seed.conversations.len()
    );
    Ok(())
}

fn spawn_quota_purge(store: Arc<MemoryQuotaStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(QUOTA_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!("Purged {} expired rate-limit bucket(s)", purged);
            }
        }
    });
}

/// Builds the application state from the configuration.
///
/// Must be called inside a tokio runtime: it spawns the quota purge task.
pub async fn build_app_state(config: &Config) -> Result<Arc<AppState>, AppError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 1. Repository
    let users = Arc::new(InMemoryUserRepository::new());
    let conversations = Arc::new(InMemoryConversationRepository::new());
    let messages = Arc::new(InMemoryMessageRepository::new());
    seed(config, &users, &conversations)
        .await
        .map_err(AppError::Seed)?;

    // 2. Session and rate limiting
    let sessions = Arc::new(
        SessionManager::new(
            &session_secret(config),
            Arc::new(InMemoryTokenListStore::new()),
            clock.clone(),
        )
        .with_ttl(config.session.ttl()),
    );
    let quota_store = Arc::new(MemoryQuotaStore::new(clock));
    let ws_limits = &config.rate_limit.websocket;
    let ws_limiter = Arc::new(RateLimiter::new(
        quota_store.clone(),
        ws_limits.quota(),
        ws_limits.vary_by,
        WEBSOCKET_LIMIT_PREFIX,
    )?);
    let http_limits = &config.rate_limit.http;
    let http_limiter = Arc::new(RateLimiter::new(
        quota_store.clone(),
        http_limits.quota(),
        http_limits.vary_by,
        HTTP_LIMIT_PREFIX,
    )?);
    spawn_quota_purge(quota_store);

    // 3. Registries and MessagePusher
    let connections = Arc::new(ConnectionRegistry::new());
    let rooms = Arc::new(RoomRegistry::new(connections.clone()));
    let message_pusher = Arc::new(RoomMessagePusher::new(rooms.clone(), connections.clone()));

    // 4. UseCases
    let conversation_rooms_usecase = Arc::new(ConversationRoomsUseCase::new(
        conversations.clone(),
        rooms.clone(),
    ));
    conversation_rooms_usecase
        .restore_rooms()
        .await
        .map_err(AppError::RestoreRooms)?;

    let dispatcher = build_dispatcher(
        ws_limiter,
        SocketUseCases {
            send_message: Arc::new(SendMessageUseCase::new(
                messages.clone(),
                conversations.clone(),
                users.clone(),
                message_pusher.clone(),
            )),
            live_edit: Arc::new(LiveEditUseCase::new(
                messages.clone(),
                conversations.clone(),
                message_pusher.clone(),
            )),
            read_messages: Arc::new(ReadMessagesUseCase::new(messages, conversations.clone())),
            notify_typing: Arc::new(NotifyTypingUseCase::new(
                conversations.clone(),
                message_pusher.clone(),
            )),
        },
    );

    Ok(Arc::new(AppState {
        session_usecase: Arc::new(SessionUseCase::new(
            sessions,
            users.clone(),
            connections.clone(),
        )),
        connect_client_usecase: Arc::new(ConnectClientUseCase::new(
            connections.clone(),
            rooms.clone(),
            conversations,
            users,
            message_pusher.clone(),
        )),
        disconnect_client_usecase: Arc::new(DisconnectClientUseCase::new(
            connections.clone(),
            rooms.clone(),
            message_pusher,
        )),
        conversation_rooms_usecase,
        dispatcher: Arc::new(dispatcher),
        http_limiter,
        connections,
        rooms,
    }))
}
