//! UseCase 層のエラー
//!
//! エンドポイントのエラーは `ApiError` でクライアントへ返します。ここには
//! エラーフレームにならない処理（接続の確立など）のエラーを置きます。

use thiserror::Error;

use crate::domain::{RepositoryError, UserId};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("failed to load conversations of user {user}: {source}")]
    ConversationLookup {
        user: UserId,
        #[source]
        source: RepositoryError,
    },
}
