//! UseCase: ログイン・ログアウト
//!
//! 資格情報の確認とトークンの発行・失効をまとめる。全端末からのログアウトは
//! トークンの全失効に加え、ユーザーのすべての WebSocket 接続を閉じる。

use std::sync::Arc;

use crate::{
    domain::{ApiError, RepositoryError, User, UserRepository},
    infrastructure::{connection::ConnectionRegistry, session::SessionManager},
};

/// Close code sent to sockets closed by a logout everywhere ("going away").
pub const LOGOUT_CLOSE_CODE: u16 = 1001;

pub struct SessionUseCase {
    sessions: Arc<SessionManager>,
    users: Arc<dyn UserRepository>,
    connections: Arc<ConnectionRegistry>,
}

impl SessionUseCase {
    pub fn new(
        sessions: Arc<SessionManager>,
        users: Arc<dyn UserRepository>,
        connections: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            sessions,
            users,
            connections,
        }
    }

    /// 資格情報を確認してトークンを発行する
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let Some(user) = self.users.verify_credentials(username, password).await? else {
            tracing::info!("Failed login attempt for '{}'", username);
            return Err(ApiError::AuthFailed);
        };
        let token = self.sessions.issue_token(&user.name).await?;
        tracing::info!("User {} logged in", user.id);
        Ok(token)
    }

    /// トークンを検証し、その所有者を返す
    pub async fn authenticate(&self, token: &str) -> Result<User, ApiError> {
        let name = self.sessions.validate_token(token).await?;
        self.users.find_by_name(&name).await.map_err(|e| match e {
            RepositoryError::NotFound => ApiError::AuthFailed,
            other => other.into(),
        })
    }

    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.sessions.revoke_token(token).await
    }

    /// すべてのトークンを失効させ、すべての接続を閉じる
    pub async fn logout_everywhere(&self, user: &User) -> Result<usize, ApiError> {
        let revoked = self.sessions.revoke_all(&user.name).await?;
        self.connections.disconnect(user.id, LOGOUT_CLOSE_CODE).await;
        Ok(revoked)
    }
}
