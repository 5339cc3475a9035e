//! Repository 実装
//!
//! - `inmemory`: ドメイン層の trait に対するインメモリ実装

pub mod inmemory;
