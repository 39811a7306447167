use async_trait::async_trait;
use hubflow_core::{CredentialRecord, MarketplaceCredentials, SupabaseConfig, UserId};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::AdminCredentialStore;
use crate::error::{StoreError, payload_snippet};

/// Credential columns on the Supabase `profiles` table, written through
/// PostgREST with the service-role key.
pub struct SupabaseProfileStore {
    http: Client,
    table_endpoint: String,
    service_role_key: SecretString,
}

#[derive(Serialize)]
struct ProfileUpsert<'a> {
    id: &'a str,
    #[serde(flatten)]
    credentials: &'a MarketplaceCredentials,
}

#[derive(Serialize)]
struct ProfileClear {
    ml_access_token: Option<String>,
    ml_refresh_token: Option<String>,
    ml_user_id: Option<String>,
}

#[derive(Deserialize)]
struct ProfileRow {
    id: String,
    ml_access_token: Option<String>,
    ml_refresh_token: Option<String>,
    ml_user_id: Option<serde_json::Value>,
}

impl ProfileRow {
    fn into_record(self) -> Option<CredentialRecord> {
        let access_token = self.ml_access_token.filter(|t| !t.is_empty())?;
        let refresh_token = self.ml_refresh_token.unwrap_or_default();
        let external_account_id = match self.ml_user_id? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => return None,
            other => other.to_string(),
        };
        Some(CredentialRecord {
            user_id: UserId::new(self.id),
            credentials: MarketplaceCredentials::new(
                access_token,
                refresh_token,
                external_account_id,
            ),
            updated_at: None,
        })
    }
}

impl SupabaseProfileStore {
    pub fn new(
        http: Client,
        base_url: &str,
        table: &str,
        service_role_key: SecretString,
    ) -> Self {
        Self {
            http,
            table_endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            service_role_key,
        }
    }

    /// Build from configuration. Returns `None` when no service-role key is
    /// configured.
    pub fn from_config(http: Client, cfg: &SupabaseConfig) -> Option<Self> {
        let key = cfg.service_role_key.clone()?;
        Some(Self::new(http, &cfg.url, &cfg.profiles_table, key))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.service_role_key.expose_secret();
        builder.header("apikey", key.as_str()).bearer_auth(key)
    }

    fn id_filter(user_id: &UserId) -> String {
        format!("eq.{}", user_id.as_str())
    }
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        payload: payload_snippet(&body),
    })
}

#[async_trait]
impl AdminCredentialStore for SupabaseProfileStore {
    async fn upsert(
        &self,
        user_id: &UserId,
        credentials: &MarketplaceCredentials,
    ) -> Result<(), StoreError> {
        let body = [ProfileUpsert {
            id: user_id.as_str(),
            credentials,
        }];
        let response = self
            .authorized(self.http.post(&self.table_endpoint))
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(StoreError::Transport)?;
        check(response).await?;
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<CredentialRecord>, StoreError> {
        let response = self
            .authorized(self.http.get(&self.table_endpoint))
            .query(&[
                ("id", Self::id_filter(user_id).as_str()),
                ("select", "id,ml_access_token,ml_refresh_token,ml_user_id"),
            ])
            .send()
            .await
            .map_err(StoreError::Transport)?;
        let rows: Vec<ProfileRow> = check(response)
            .await?
            .json()
            .await
            .map_err(StoreError::Transport)?;
        Ok(rows.into_iter().next().and_then(ProfileRow::into_record))
    }

    /// Clears the credential columns; the profile row belongs to the
    /// identity provider and is left in place.
    async fn delete(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let existed = self.get(user_id).await?.is_some();
        let response = self
            .authorized(self.http.patch(&self.table_endpoint))
            .query(&[("id", Self::id_filter(user_id).as_str())])
            .header("Prefer", "return=minimal")
            .json(&ProfileClear {
                ml_access_token: None,
                ml_refresh_token: None,
                ml_user_id: None,
            })
            .send()
            .await
            .map_err(StoreError::Transport)?;
        check(response).await?;
        Ok(existed)
    }
}
