//! Request handlers.

mod http;
mod websocket;

pub use http::{create_conversation, delete_conversation, health_check, login, logout, logout_all};
pub use websocket::websocket_handler;
