//! Connection Registry
//!
//! ## 責務
//!
//! - ユーザー ID から `Client` への対応を管理（1 ユーザー = 1 `Client`）
//! - 1 つの `Client` は複数の物理接続（タブ・端末）を持てる
//! - `Client` ごとに 1 つの送信ループがチャネルを読み、全接続へ書き込む
//!
//! ## 設計ノート
//!
//! 物理接続は `FrameSink` trait object として保持します。WebSocket の生成は
//! UI 層で行われ、ここでは送信と切断だけを扱います。

pub mod client;
pub mod registry;

pub use client::{Client, ClientClosed, CloseSignal, Connection, ConnectionId, FrameSink, SinkError};
pub use registry::ConnectionRegistry;
