//! JWT session tokens with per-user revocation lists.
//!
//! Each user has an active list (`valid__<name>`) and a revoked list
//! (`invalid__<name>`) in the token list store. A token is valid iff its
//! signature verifies, it has not expired and it is not on the revoked list.
//! Revoked entries keep the token's expiry and are garbage-collected once it
//! passes, at which point the token is expired anyway.

use std::{sync::Arc, time::Duration};

use codechat_shared::time::{Clock, timestamp_to_rfc3339};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{ApiError, TokenListStore, TokenRecord};

pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub name: String,
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
}

pub struct SessionManager {
    store: Arc<dyn TokenListStore>,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    /// Serializes list moves so two revocations never interleave.
    moves: Mutex<()>,
}

fn active_list(name: &str) -> String {
    format!("valid__{name}")
}

fn revoked_list(name: &str) -> String {
    format!("invalid__{name}")
}

impl SessionManager {
    pub fn new(secret: &[u8], store: Arc<dyn TokenListStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: SESSION_TTL,
            moves: Mutex::new(()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn issue_token(&self, name: &str) -> Result<String, ApiError> {
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            name: name.to_string(),
            exp: self.clock.now_secs().saturating_add(ttl_secs),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Database(format!("token signing failed: {e}")))?;

        self.store
            .push(
                &active_list(name),
                TokenRecord {
                    token: token.clone(),
                    expires_at: claims.exp,
                },
            )
            .await?;

        tracing::debug!(
            "Issued session token for '{}' valid until {}",
            name,
            timestamp_to_rfc3339(claims.exp.saturating_mul(1000))
        );
        Ok(token)
    }

    /// Returns the token owner's name if the token is currently valid.
    pub async fn validate_token(&self, token: &str) -> Result<String, ApiError> {
        let claims = self.decode_claims(token)?;

        let revoked = self.collect_garbage(&revoked_list(&claims.name)).await?;
        if revoked.iter().any(|record| record.token == token) {
            tracing::debug!("Rejected revoked token of '{}'", claims.name);
            return Err(ApiError::InvalidToken);
        }

        if claims.exp <= self.clock.now_secs() {
            return Err(ApiError::InvalidToken);
        }

        Ok(claims.name)
    }

    /// Moves one token to the revoked list. Expired tokens need no record
    /// and are only dropped from the active list.
    pub async fn revoke_token(&self, token: &str) -> Result<(), ApiError> {
        let claims = self.decode_claims(token)?;
        let now = self.clock.now_secs();
        let _guard = self.moves.lock().await;

        let active = active_list(&claims.name);
        for record in self.store.list(&active).await? {
            if record.token == token || record.expires_at <= now {
                self.store.remove(&active, &record).await?;
            }
        }

        let revoked = self.collect_garbage(&revoked_list(&claims.name)).await?;
        if claims.exp > now && !revoked.iter().any(|record| record.token == token) {
            self.store
                .push(
                    &revoked_list(&claims.name),
                    TokenRecord {
                        token: token.to_string(),
                        expires_at: claims.exp,
                    },
                )
                .await?;
        }

        tracing::info!("Revoked a session token of '{}'", claims.name);
        Ok(())
    }

    /// Revokes every active, unexpired token of the user.
    pub async fn revoke_all(&self, name: &str) -> Result<usize, ApiError> {
        let now = self.clock.now_secs();
        let _guard = self.moves.lock().await;

        let active = active_list(name);
        let revoked = revoked_list(name);
        self.collect_garbage(&revoked).await?;

        let mut count = 0;
        for record in self.store.list(&active).await? {
            self.store.remove(&active, &record).await?;
            if record.expires_at > now {
                self.store.push(&revoked, record).await?;
                count += 1;
            }
        }

        tracing::info!("Revoked {} session token(s) of '{}'", count, name);
        Ok(count)
    }

    /// Verifies the signature only. Expiry is checked against the injected
    /// clock by the callers.
    fn decode_claims(&self, token: &str) -> Result<SessionClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token rejected: {}", e);
                ApiError::InvalidToken
            })
    }

    /// Drops expired records from `list` and returns the remaining ones.
    async fn collect_garbage(&self, list: &str) -> Result<Vec<TokenRecord>, ApiError> {
        let now = self.clock.now_secs();
        let mut live = Vec::new();
        for record in self.store.list(list).await? {
            if record.expires_at <= now {
                self.store.remove(list, &record).await?;
            } else {
                live.push(record);
            }
        }
        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repository::inmemory::InMemoryTokenListStore;
    use codechat_shared::time::ManualClock;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 発行・検証・失効・全失効の状態遷移（Active → Revoked / Active → Expired）
    // - 失効記録は有効期限まで残り、期限後に掃除されること
    // ========================================

    const SECRET: &[u8] = b"test-secret";
    const START_MILLIS: i64 = 1_700_000_000_000;

    fn create_test_manager() -> (Arc<ManualClock>, Arc<InMemoryTokenListStore>, SessionManager) {
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let store = Arc::new(InMemoryTokenListStore::new());
        let manager = SessionManager::new(SECRET, store.clone(), clock.clone());
        (clock, store, manager)
    }

    #[tokio::test]
    async fn test_issued_token_validates_to_its_owner() {
        // テスト項目: 発行したトークンは検証するとユーザー名を返す
        // given (前提条件):
        let (_clock, store, manager) = create_test_manager();

        // when (操作):
        let token = manager.issue_token("alice").await.unwrap();
        let name = manager.validate_token(&token).await.unwrap();

        // then (期待する結果):
        assert_eq!(name, "alice");
        let active = store.list("valid__alice").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].expires_at, START_MILLIS / 1000 + SESSION_TTL.as_secs() as i64);
    }

    #[tokio::test]
    async fn test_token_is_valid_until_and_only_until_expiry() {
        // テスト項目: トークンは有効期限の直前まで有効で、期限ちょうどで無効になる
        // given (前提条件):
        let (clock, _store, manager) = create_test_manager();
        let manager = manager.with_ttl(Duration::from_secs(60));
        let token = manager.issue_token("alice").await.unwrap();

        // when (操作):
        clock.advance(Duration::from_secs(59));
        let before = manager.validate_token(&token).await;
        clock.advance(Duration::from_secs(1));
        let at_expiry = manager.validate_token(&token).await;

        // then (期待する結果):
        assert!(before.is_ok());
        assert!(matches!(at_expiry, Err(ApiError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected_and_record_collected_after_expiry() {
        // テスト項目: 失効したトークンは即座に拒否され、失効記録は期限後に掃除される
        // given (前提条件):
        let (clock, store, manager) = create_test_manager();
        let manager = manager.with_ttl(Duration::from_secs(3600));
        let token = manager.issue_token("alice").await.unwrap();

        // when (操作):
        manager.revoke_token(&token).await.unwrap();
        let right_after = manager.validate_token(&token).await;
        clock.advance(Duration::from_secs(1800));
        let later = manager.validate_token(&token).await;
        let revoked_before_expiry = store.list("invalid__alice").await.unwrap();
        clock.advance(Duration::from_secs(1800));
        let after_expiry = manager.validate_token(&token).await;

        // then (期待する結果):
        assert!(matches!(right_after, Err(ApiError::InvalidToken)));
        assert!(matches!(later, Err(ApiError::InvalidToken)));
        assert_eq!(revoked_before_expiry.len(), 1);
        assert!(matches!(after_expiry, Err(ApiError::InvalidToken)));
        assert!(store.list("invalid__alice").await.unwrap().is_empty());
        assert!(store.list("valid__alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_all_leaves_other_users_untouched() {
        // テスト項目: 全失効は対象ユーザーのトークンだけを無効にする
        // given (前提条件):
        let (_clock, _store, manager) = create_test_manager();
        let alice_laptop = manager.issue_token("alice").await.unwrap();
        let alice_phone = manager.issue_token("alice").await.unwrap();
        let bob = manager.issue_token("bob").await.unwrap();

        // when (操作):
        let count = manager.revoke_all("alice").await.unwrap();

        // then (期待する結果):
        assert_eq!(count, 2);
        assert!(manager.validate_token(&alice_laptop).await.is_err());
        assert!(manager.validate_token(&alice_phone).await.is_err());
        assert_eq!(manager.validate_token(&bob).await.unwrap(), "bob");
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_invalid() {
        // テスト項目: 別の秘密鍵で署名されたトークンは検証も失効もできない
        // given (前提条件):
        let (clock, store, manager) = create_test_manager();
        let forger = SessionManager::new(b"other-secret", store, clock);
        let forged = forger.issue_token("alice").await.unwrap();

        // when (操作):
        let validated = manager.validate_token(&forged).await;
        let revoked = manager.revoke_token("not-a-jwt").await;

        // then (期待する結果):
        assert!(matches!(validated, Err(ApiError::InvalidToken)));
        assert!(matches!(revoked, Err(ApiError::InvalidToken)));
    }
}
