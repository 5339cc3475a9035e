//! メッセージ送信（通知）の実装
//!
//! `MessagePusher` trait の具体的な実装を提供します。
//!
//! - `room`: Room Registry と Connection Registry を使った実装

pub mod room;

pub use room::RoomMessagePusher;
