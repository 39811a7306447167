use async_trait::async_trait;
use chrono::Utc;
use hubflow_core::{CredentialRecord, MarketplaceCredentials, UserId};
use std::collections::HashMap;
use std::sync::RwLock;

use super::AdminCredentialStore;
use crate::error::StoreError;

/// Process-local store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<UserId, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Internal(anyhow::anyhow!("credential map lock poisoned"))
}

#[async_trait]
impl AdminCredentialStore for MemoryCredentialStore {
    async fn upsert(
        &self,
        user_id: &UserId,
        credentials: &MarketplaceCredentials,
    ) -> Result<(), StoreError> {
        let record = CredentialRecord {
            user_id: user_id.clone(),
            credentials: credentials.clone(),
            updated_at: Some(Utc::now()),
        };
        self.records
            .write()
            .map_err(|_| poisoned())?
            .insert(user_id.clone(), record);
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .map_err(|_| poisoned())?
            .get(user_id)
            .cloned())
    }

    async fn delete(&self, user_id: &UserId) -> Result<bool, StoreError> {
        Ok(self
            .records
            .write()
            .map_err(|_| poisoned())?
            .remove(user_id)
            .is_some())
    }
}
