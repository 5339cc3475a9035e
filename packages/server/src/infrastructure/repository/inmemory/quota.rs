//! InMemory QuotaStore 実装
//!
//! DashMap のエントリ API で比較と更新をアトミックに行います。期限切れの
//! エントリは読み出し時に存在しないものとして扱います。

use std::{sync::Arc, time::Duration};

use codechat_shared::time::Clock;
use dashmap::{DashMap, mapref::entry::Entry};

use crate::domain::{QuotaStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct QuotaEntry {
    value: i64,
    expires_at: i64,
}

impl QuotaEntry {
    fn live_value(&self, now: i64) -> Option<i64> {
        (self.expires_at > now).then_some(self.value)
    }
}

pub struct MemoryQuotaStore {
    entries: DashMap<String, QuotaEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryQuotaStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Drops expired entries so idle buckets do not accumulate.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry_for(&self, value: i64, ttl: Duration, now: i64) -> QuotaEntry {
        let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        QuotaEntry {
            value,
            expires_at: now.saturating_add(ttl),
        }
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn get_with_time(&self, key: &str) -> Result<(Option<i64>, i64), StoreError> {
        let now = self.clock.now_millis();
        let value = self.entries.get(key).and_then(|entry| entry.live_value(now));
        Ok((value, now))
    }

    fn set_if_not_exists_with_ttl(
        &self,
        key: &str,
        value: i64,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now_millis();
        let new_entry = self.entry_for(value, ttl, now);
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().live_value(now).is_some() {
                    return Ok(false);
                }
                occupied.insert(new_entry);
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(new_entry);
                Ok(true)
            }
        }
    }

    fn compare_and_swap_with_ttl(
        &self,
        key: &str,
        old: i64,
        new: i64,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now_millis();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) if occupied.get().live_value(now) == Some(old) => {
                occupied.insert(self.entry_for(new, ttl, now));
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
