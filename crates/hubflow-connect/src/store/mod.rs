//! Credential store backends.
//!
//! Every backend writes with administrative privilege: end users never hold
//! a handle that can set credential fields directly.

mod memory;
mod sqlite;
mod supabase;

pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;
pub use supabase::SupabaseProfileStore;

use async_trait::async_trait;
use hubflow_core::{
    CredentialRecord, MarketplaceCredentials, StoreBackend, StoreConfig, SupabaseConfig, UserId,
};
use reqwest::Client;
use std::sync::Arc;

use crate::error::StoreError;

/// Write capability for credential records, keyed by local user id.
#[async_trait]
pub trait AdminCredentialStore: Send + Sync {
    /// Insert the record for `user_id`, or overwrite it in place.
    async fn upsert(
        &self,
        user_id: &UserId,
        credentials: &MarketplaceCredentials,
    ) -> Result<(), StoreError>;

    /// Fetch the record for `user_id`, if linked.
    async fn get(&self, user_id: &UserId) -> Result<Option<CredentialRecord>, StoreError>;

    /// Remove the record for `user_id`. Returns whether one existed.
    async fn delete(&self, user_id: &UserId) -> Result<bool, StoreError>;
}

/// Create a store backend based on configuration.
pub async fn create_store(
    store: &StoreConfig,
    supabase: &SupabaseConfig,
    http: Client,
) -> Result<Arc<dyn AdminCredentialStore>, StoreError> {
    match store.backend {
        StoreBackend::Supabase => {
            let store = SupabaseProfileStore::from_config(http, supabase).ok_or_else(|| {
                StoreError::Internal(anyhow::anyhow!(
                    "supabase store selected but no service-role key configured"
                ))
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Sqlite => {
            let store = SqliteCredentialStore::open(&store.sqlite_path).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory credential store; linked accounts are lost on restart");
            Ok(Arc::new(MemoryCredentialStore::new()))
        }
    }
}
