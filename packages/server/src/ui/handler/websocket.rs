//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{
        ConnectInfo, Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    domain::{ApiError, CorrelationId, Frame, User},
    infrastructure::connection::{Connection, FrameSink, SinkError},
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: String,
}

/// Write half of an axum websocket.
struct WsSink {
    sender: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_text(&self, text: String) -> Result<(), SinkError> {
        self.sender
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SinkError(e.to_string()))
    }

    async fn close(&self, code: u16) -> Result<(), SinkError> {
        let frame = CloseFrame {
            code,
            reason: "".into(),
        };
        self.sender
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user = match state.session_usecase.authenticate(&query.token).await {
        Ok(user) => user,
        Err(ApiError::Database(detail)) => return Err(ApiError::Database(detail)),
        Err(e) => {
            tracing::warn!("Rejected websocket from {}: {}", remote_addr, e);
            return Err(ApiError::AuthFailed);
        }
    };

    tracing::info!("User {} upgrading websocket from {}", user.id, remote_addr);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user, remote_addr)))
}

/// Parses one text frame and dispatches it. Returns the error frame for the
/// requesting connection, if any.
async fn handle_text(state: &AppState, user: &User, remote_addr: &str, text: &str) -> Option<Frame> {
    match serde_json::from_str::<Frame>(text) {
        Ok(frame) => state.dispatcher.dispatch(user.id, remote_addr, frame).await,
        Err(e) => {
            tracing::debug!("Malformed frame from user {}: {}", user.id, e);
            let id = serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|v| v.get("id").and_then(Value::as_i64))
                .unwrap_or_default();
            Some(Frame::error(&ApiError::from(e), CorrelationId::new(id)))
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: User, remote_addr: SocketAddr) {
    let (sender, mut receiver) = socket.split();
    let sink = Arc::new(WsSink {
        sender: Mutex::new(sender),
    });
    let remote_addr = remote_addr.to_string();
    let connection = Connection::new(remote_addr.clone(), sink.clone());
    let connection_id = connection.id();

    let client = match state
        .connect_client_usecase
        .execute(user.id, connection)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to register user {}: {}", user.id, e);
            let _ = sink.close(1011).await;
            return;
        }
    };

    // Frames of one connection are handled strictly in order.
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("WebSocket error for user {}: {}", user.id, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let Some(reply) = handle_text(&state, &user, &remote_addr, text.as_str()).await
                else {
                    continue;
                };
                let Ok(json) = serde_json::to_string(&reply) else {
                    continue;
                };
                if let Err(e) = sink.send_text(json).await {
                    tracing::debug!("Failed to answer user {}: {}", user.id, e);
                    break;
                }
            }
            Message::Close(_) => {
                tracing::info!("User {} requested close", user.id);
                break;
            }
            _ => {}
        }
    }

    state
        .disconnect_client_usecase
        .execute(&client, connection_id)
        .await;
}
