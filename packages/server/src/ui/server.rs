//! Router assembly and server execution.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        create_conversation, delete_conversation, health_check, login, logout, logout_all,
        websocket_handler,
    },
    middleware::http_rate_limit,
    signal::shutdown_signal,
    state::AppState,
};

/// Builds the router with every route behind the HTTP rate limit.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/websocket", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/api/v1/logout-all", post(logout_all))
        .route("/api/v1/conversations", post(create_conversation))
        .route("/api/v1/conversations/{id}", delete(delete_conversation))
        .layer(middleware::from_fn_with_state(state.clone(), http_rate_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves on an already bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// Run the codechat server
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified address or
/// if there's an error during server execution.
pub async fn run(state: Arc<AppState>, host: &str, port: u16) -> std::io::Result<()> {
    let bind_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("codechat server listening on {}", listener.local_addr()?);
    tracing::info!("Connect to: ws://{}/websocket?token=...", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    serve_with_shutdown(listener, state, shutdown_signal()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
