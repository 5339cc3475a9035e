//! Data Transfer Objects (DTOs).
//!
//! DTOs are organized by protocol:
//! - `websocket`: payloads carried inside websocket frames
//! - `http`: HTTP API request and response bodies

pub mod http;
pub mod websocket;
