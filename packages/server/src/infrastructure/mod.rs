//! Infrastructure layer
//!
//! 接続・ルームの多重化、セッション管理、レート制限、そしてドメイン層の
//! trait に対するインメモリ実装を提供します。

pub mod connection;
pub mod dto;
pub mod message_pusher;
pub mod rate_limit;
pub mod repository;
pub mod room;
pub mod session;
