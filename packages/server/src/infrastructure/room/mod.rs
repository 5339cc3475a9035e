//! Room Registry
//!
//! 会話 ID ごとにルーム（接続中メンバーの集合）を管理し、ルーム単位の
//! ブロードキャストを提供します。

pub mod registry;

pub use registry::{Room, RoomRegistry};
