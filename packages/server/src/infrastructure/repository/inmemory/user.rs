//! InMemory User Repository 実装
//!
//! パスワードは argon2 のハッシュとして保持します。

use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{RepositoryError, User, UserId, UserRepository};

struct UserRecord {
    user: User,
    password_hash: String,
    last_online: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

pub fn hash_password(password: &str) -> Result<String, RepositoryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RepositoryError::Backend(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, RepositoryError> {
    let parsed = PasswordHash::new(hash).map_err(|e| RepositoryError::Backend(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(
        &self,
        id: UserId,
        name: &str,
        password: &str,
    ) -> Result<User, RepositoryError> {
        let user = User {
            id,
            name: name.to_string(),
        };
        let record = UserRecord {
            user: user.clone(),
            password_hash: hash_password(password)?,
            last_online: None,
        };
        self.users.write().await.insert(id, record);
        Ok(user)
    }

    pub async fn last_online(&self, id: UserId) -> Option<DateTime<Utc>> {
        self.users.read().await.get(&id).and_then(|r| r.last_online)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_name(&self, name: &str) -> Result<User, RepositoryError> {
        self.users
            .read()
            .await
            .values()
            .find(|r| r.user.name == name)
            .map(|r| r.user.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, RepositoryError> {
        self.users
            .read()
            .await
            .get(&id)
            .map(|r| r.user.clone())
            .ok_or(RepositoryError::NotFound)
    }

    async fn verify_credentials(
        &self,
        name: &str,
        password: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let candidate = self
            .users
            .read()
            .await
            .values()
            .find(|r| r.user.name == name)
            .map(|r| (r.user.clone(), r.password_hash.clone()));

        match candidate {
            Some((user, hash)) if verify_password(password, &hash)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    async fn update_online_timestamp(&self, user: UserId) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(&user).ok_or(RepositoryError::NotFound)?;
        record.last_online = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_credentials_checks_the_password_hash() {
        // テスト項目: 正しいパスワードでのみ資格情報の検証に成功する
        // given (前提条件):
        let repo = InMemoryUserRepository::new();
        repo.add_user(UserId::new(1), "alice", "wonderland").await.unwrap();

        // when (操作):
        let good = repo.verify_credentials("alice", "wonderland").await.unwrap();
        let bad = repo.verify_credentials("alice", "guess").await.unwrap();
        let unknown = repo.verify_credentials("mallory", "wonderland").await.unwrap();

        // then (期待する結果):
        assert_eq!(good.map(|u| u.id), Some(UserId::new(1)));
        assert!(bad.is_none());
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_update_online_timestamp_records_time() {
        // テスト項目: オンライン時刻が記録され、未登録ユーザーは NotFound
        // given (前提条件):
        let repo = InMemoryUserRepository::new();
        repo.add_user(UserId::new(1), "alice", "pw").await.unwrap();

        // when (操作):
        repo.update_online_timestamp(UserId::new(1)).await.unwrap();
        let missing = repo.update_online_timestamp(UserId::new(2)).await;

        // then (期待する結果):
        assert!(repo.last_online(UserId::new(1)).await.is_some());
        assert!(matches!(missing, Err(RepositoryError::NotFound)));
    }
}
