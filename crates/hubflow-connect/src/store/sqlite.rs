use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubflow_core::{CredentialRecord, MarketplaceCredentials, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::fs;
use std::path::Path;

use super::AdminCredentialStore;
use crate::error::StoreError;

/// Credential records in a local SQLite file (`marketplace_credentials`).
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct CredentialRow {
    user_id: String,
    ml_access_token: String,
    ml_refresh_token: String,
    ml_user_id: String,
    updated_at: DateTime<Utc>,
}

impl From<CredentialRow> for CredentialRecord {
    fn from(row: CredentialRow) -> Self {
        CredentialRecord {
            user_id: UserId::new(row.user_id),
            credentials: MarketplaceCredentials::new(
                row.ml_access_token,
                row.ml_refresh_token,
                row.ml_user_id,
            ),
            updated_at: Some(row.updated_at),
        }
    }
}

impl SqliteCredentialStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        ensure_parent_dir(path)?;
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, running migrations first.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl AdminCredentialStore for SqliteCredentialStore {
    async fn upsert(
        &self,
        user_id: &UserId,
        credentials: &MarketplaceCredentials,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO marketplace_credentials \
                 (user_id, ml_access_token, ml_refresh_token, ml_user_id, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                 ml_access_token = excluded.ml_access_token, \
                 ml_refresh_token = excluded.ml_refresh_token, \
                 ml_user_id = excluded.ml_user_id, \
                 updated_at = excluded.updated_at",
        )
        .bind(user_id.as_str())
        .bind(&credentials.access_token)
        .bind(&credentials.refresh_token)
        .bind(&credentials.external_account_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<CredentialRecord>, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT user_id, ml_access_token, ml_refresh_token, ml_user_id, updated_at \
             FROM marketplace_credentials WHERE user_id = ?",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CredentialRecord::from))
    }

    async fn delete(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM marketplace_credentials WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn ensure_parent_dir(file_path: &str) -> Result<(), StoreError> {
    let p = Path::new(file_path);
    if let Some(parent) = p.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
