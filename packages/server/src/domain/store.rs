//! Key-value stores backing the session manager and the rate limiter.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::ApiError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("gave up updating '{0}' after repeated contention")]
    Contention(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Database(err.to_string())
    }
}

/// One token entry on a session list. `expires_at` is a Unix timestamp in
/// seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub token: String,
    pub expires_at: i64,
}

/// Named lists of token records (one active and one revoked list per user).
#[async_trait]
pub trait TokenListStore: Send + Sync {
    async fn push(&self, list: &str, record: TokenRecord) -> Result<(), StoreError>;

    async fn list(&self, list: &str) -> Result<Vec<TokenRecord>, StoreError>;

    /// Removes every entry equal to `record`.
    async fn remove(&self, list: &str, record: &TokenRecord) -> Result<(), StoreError>;
}

/// Storage for GCRA theoretical arrival times. Values and times are Unix
/// timestamps in milliseconds; entries disappear once their TTL passes.
pub trait QuotaStore: Send + Sync {
    /// Returns the stored value for `key`, if any, and the store's notion of
    /// the current time.
    fn get_with_time(&self, key: &str) -> Result<(Option<i64>, i64), StoreError>;

    /// Stores `value` only if `key` is absent. Returns whether it was stored.
    fn set_if_not_exists_with_ttl(
        &self,
        key: &str,
        value: i64,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Replaces `old` with `new` only if `key` still holds `old`. Returns
    /// whether the swap happened.
    fn compare_and_swap_with_ttl(
        &self,
        key: &str,
        old: i64,
        new: i64,
        ttl: Duration,
    ) -> Result<bool, StoreError>;
}
