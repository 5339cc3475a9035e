//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::{
    domain::{ApiError, ConversationId},
    infrastructure::dto::http::{
        ConversationResponse, CreateConversationRequest, HealthResponse, LoginRequest,
        SuccessResponse,
    },
    ui::{middleware::AuthUser, state::AppState},
};

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::JsonFormat(rejection.body_text()))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connected_clients: state.connections.len().await,
        rooms: state.rooms.room_ids().await.len(),
    })
}

/// Verifies the credentials and hands out a session token in the
/// `Authorization` header.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let token = state
        .session_usecase
        .login(&request.username, &request.password)
        .await?;
    Ok((
        [(header::AUTHORIZATION, format!("Bearer {}", token))],
        Json(SuccessResponse::ok()),
    ))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.session_usecase.logout(&auth.token).await?;
    tracing::info!("User {} logged out", auth.user.id);
    Ok(Json(SuccessResponse::ok()))
}

/// Revokes every token of the caller and closes all of their sockets.
pub async fn logout_all(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<SuccessResponse>, ApiError> {
    let revoked = state.session_usecase.logout_everywhere(&auth.user).await?;
    tracing::info!("User {} logged out everywhere ({} token(s))", auth.user.id, revoked);
    Ok(Json(SuccessResponse::ok()))
}

pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    payload: Result<Json<CreateConversationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;
    let conversation = state
        .conversation_rooms_usecase
        .create_conversation(auth.user.id, &request.title, &request.initial_members)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ConversationResponse::from(conversation)),
    ))
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(conversation_id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .conversation_rooms_usecase
        .delete_conversation(auth.user.id, ConversationId::new(conversation_id))
        .await?;
    Ok(Json(SuccessResponse::ok()))
}
