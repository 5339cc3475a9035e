//! Request guards shared by the HTTP routes.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    domain::{ApiError, User},
    ui::state::AppState,
};

/// Applies the HTTP quota to every route before it runs.
pub async fn http_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    match state.http_limiter.check(
        request.method().as_str(),
        request.uri().path(),
        &remote_addr,
    ) {
        Ok(Some(info)) => {
            tracing::info!("HTTP request from {} rate limited", remote_addr);
            return ApiError::RequestLimitExceeded(info).into_response();
        }
        Ok(None) => {}
        Err(e) => tracing::error!("Rate limiter unavailable, admitting request: {}", e),
    }

    next.run(request).await
}

/// The user behind the request's `Authorization: Bearer` token.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::AuthFailed)?
            .to_string();

        let user = state.session_usecase.authenticate(&token).await?;
        Ok(AuthUser { user, token })
    }
}
