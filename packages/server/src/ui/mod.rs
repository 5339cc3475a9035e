//! HTTP and WebSocket surface.

mod error;
mod handler;
mod middleware;
mod server;
mod signal;
pub mod state;

pub use server::{router, run, serve_with_shutdown};
pub use signal::shutdown_signal;
pub use state::AppState;
