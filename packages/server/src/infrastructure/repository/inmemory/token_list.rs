//! InMemory TokenListStore 実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{StoreError, TokenListStore, TokenRecord};

#[derive(Default)]
pub struct InMemoryTokenListStore {
    lists: Mutex<HashMap<String, Vec<TokenRecord>>>,
}

impl InMemoryTokenListStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenListStore for InMemoryTokenListStore {
    async fn push(&self, list: &str, record: TokenRecord) -> Result<(), StoreError> {
        self.lists
            .lock()
            .await
            .entry(list.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn list(&self, list: &str) -> Result<Vec<TokenRecord>, StoreError> {
        Ok(self.lists.lock().await.get(list).cloned().unwrap_or_default())
    }

    async fn remove(&self, list: &str, record: &TokenRecord) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().await;
        if let Some(records) = lists.get_mut(list) {
            records.retain(|r| r != record);
            if records.is_empty() {
                lists.remove(list);
            }
        }
        Ok(())
    }
}
