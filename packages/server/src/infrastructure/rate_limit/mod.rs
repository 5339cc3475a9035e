//! Rate Limiter
//!
//! GCRA (generic cell rate algorithm) over a pluggable quota store, keyed by
//! a configurable vary-by policy.

pub mod gcra;
pub mod vary_by;

use std::sync::Arc;

use crate::domain::{LimitInfo, QuotaStore, StoreError};

pub use gcra::{GcraRateLimiter, RateLimitConfigError, RateQuota};
pub use vary_by::VaryBy;

/// Per-request limiter: builds the bucket key from the request and asks the
/// GCRA whether the request may pass.
pub struct RateLimiter {
    gcra: GcraRateLimiter,
    vary_by: VaryBy,
    key_prefix: String,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn QuotaStore>,
        quota: RateQuota,
        vary_by: VaryBy,
        key_prefix: impl Into<String>,
    ) -> Result<Self, RateLimitConfigError> {
        Ok(Self {
            gcra: GcraRateLimiter::new(store, quota)?,
            vary_by,
            key_prefix: key_prefix.into(),
        })
    }

    /// Returns `Some` with the limit state when the request must be rejected.
    pub fn check(
        &self,
        method: &str,
        resource: &str,
        remote_addr: &str,
    ) -> Result<Option<LimitInfo>, StoreError> {
        let key = self
            .vary_by
            .key(&self.key_prefix, method, resource, remote_addr);
        let decision = self.gcra.rate_limit(&key)?;
        if decision.limited {
            tracing::debug!("Request limited: key={} retry_after={}s", key, decision.info.retry_after);
            Ok(Some(decision.info))
        } else {
            Ok(None)
        }
    }
}
