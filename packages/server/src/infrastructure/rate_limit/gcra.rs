//! Generic cell rate algorithm.
//!
//! Each bucket stores its theoretical arrival time (TAT). With an emission
//! interval `T = 60s / per_minute` and a tolerance of `burst * T`, a request
//! arriving at `now` is admitted iff `max(now, tat) + T - tolerance <= now`,
//! in which case the TAT advances by `T`. A burst of `b` therefore admits `b`
//! requests at once and then one every `T`.

use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{LimitInfo, QuotaStore, StoreError};

/// How often a compare-and-swap is retried before giving up on a bucket.
const MAX_CAS_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateQuota {
    pub per_minute: u32,
    pub burst: u32,
}

#[derive(Debug, Error)]
pub enum RateLimitConfigError {
    #[error("rate must be at least one request per minute")]
    ZeroRate,
    #[error("burst must be at least one request")]
    ZeroBurst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub limited: bool,
    pub info: LimitInfo,
}

pub struct GcraRateLimiter {
    store: Arc<dyn QuotaStore>,
    emission_interval: i64,
    tolerance: i64,
    limit: u32,
}

impl GcraRateLimiter {
    pub fn new(store: Arc<dyn QuotaStore>, quota: RateQuota) -> Result<Self, RateLimitConfigError> {
        if quota.per_minute == 0 {
            return Err(RateLimitConfigError::ZeroRate);
        }
        if quota.burst == 0 {
            return Err(RateLimitConfigError::ZeroBurst);
        }
        let emission_interval = 60_000 / i64::from(quota.per_minute);
        Ok(Self {
            store,
            emission_interval,
            tolerance: emission_interval * i64::from(quota.burst),
            limit: quota.burst,
        })
    }

    /// Counts one request against `key`.
    pub fn rate_limit(&self, key: &str) -> Result<Decision, StoreError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let (stored, now) = self.store.get_with_time(key)?;
            let tat = stored.unwrap_or(now);
            let new_tat = tat.max(now) + self.emission_interval;
            let allow_at = new_tat - self.tolerance;

            if now < allow_at {
                return Ok(self.decision(true, allow_at - now, tat - now));
            }

            let ttl = new_tat - now;
            let ttl_duration = Duration::from_millis(ttl.unsigned_abs());
            let updated = match stored {
                None => self.store.set_if_not_exists_with_ttl(key, new_tat, ttl_duration)?,
                Some(old) => self
                    .store
                    .compare_and_swap_with_ttl(key, old, new_tat, ttl_duration)?,
            };
            if updated {
                return Ok(self.decision(false, 0, ttl));
            }
        }

        Err(StoreError::Contention(key.to_string()))
    }

    fn decision(&self, limited: bool, retry_after: i64, ttl: i64) -> Decision {
        let next = self.tolerance - ttl;
        let remaining = if next > -self.emission_interval {
            (next / self.emission_interval).max(0)
        } else {
            0
        };
        Decision {
            limited,
            info: LimitInfo {
                retry_after: ceil_secs(retry_after),
                remaining: remaining.unsigned_abs(),
                limit: u64::from(self.limit),
                reset_after: ceil_secs(ttl),
            },
        }
    }
}

fn ceil_secs(millis: i64) -> u64 {
    millis.max(0).unsigned_abs().div_ceil(1000)
}
