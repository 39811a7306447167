//! Account lifecycle around a linked marketplace account: status, disconnect
//! and token refresh for the signed-in user.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use hubflow_core::{CredentialRecord, MarketplaceCredentials, UserId};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::error::{IdentityError, StoreError, TokenExchangeError};
use crate::identity::{IdentityResolver, RequestContext};
use crate::provider::TokenExchangeClient;
use crate::store::AdminCredentialStore;

/// Public view of a credential record. Never carries tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub external_account_id: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConnectionStatus {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            external_account_id: None,
            updated_at: None,
        }
    }
}

impl From<Option<CredentialRecord>> for ConnectionStatus {
    fn from(record: Option<CredentialRecord>) -> Self {
        match record {
            Some(record) => Self {
                connected: true,
                external_account_id: Some(record.credentials.external_account_id),
                updated_at: record.updated_at,
            },
            None => Self::disconnected(),
        }
    }
}

/// Errors from the account endpoints.
#[derive(Debug, Error)]
pub enum AccountError {
    /// No resolvable session.
    #[error("not signed in: {0}")]
    Unauthenticated(#[from] IdentityError),

    /// No linked account for the user.
    #[error("no marketplace account linked for user {0}")]
    NotConnected(UserId),

    /// The provider refused to refresh.
    #[error("token refresh failed: {0}")]
    Refresh(#[from] TokenExchangeError),

    /// Store failure while refreshing.
    #[error("credential store error during refresh: {0}")]
    RefreshStore(#[source] StoreError),

    /// Store failure.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AccountError::Unauthenticated(_) => (
                StatusCode::UNAUTHORIZED,
                "Could not identify the user. Please sign in again.",
            ),
            AccountError::NotConnected(_) => (
                StatusCode::NOT_FOUND,
                "No Mercado Livre account is connected.",
            ),
            AccountError::Refresh(_) | AccountError::RefreshStore(_) => (
                StatusCode::BAD_GATEWAY,
                "Could not refresh the Mercado Livre connection.",
            ),
            AccountError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not update the Mercado Livre connection.",
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "marketplace account request failed");
        } else {
            tracing::warn!(error = %self, "marketplace account request rejected");
        }

        (status, message).into_response()
    }
}

/// Status, disconnect and refresh for the caller's linked account.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityResolver>,
    tokens: Arc<dyn TokenExchangeClient>,
    store: Arc<dyn AdminCredentialStore>,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        tokens: Arc<dyn TokenExchangeClient>,
        store: Arc<dyn AdminCredentialStore>,
    ) -> Self {
        Self {
            identity,
            tokens,
            store,
        }
    }

    pub async fn status(&self, ctx: &RequestContext) -> Result<ConnectionStatus, AccountError> {
        let user_id = self.identity.resolve(ctx).await?;
        Ok(self.store.get(&user_id).await?.into())
    }

    /// Remove the caller's credentials. Succeeds whether or not a record
    /// existed.
    pub async fn disconnect(&self, ctx: &RequestContext) -> Result<(), AccountError> {
        let user_id = self.identity.resolve(ctx).await?;
        let removed = self.store.delete(&user_id).await?;
        tracing::info!(user_id = %user_id, removed, "marketplace account disconnected");
        Ok(())
    }

    /// Trade the stored refresh token for a new token set and store it.
    pub async fn refresh(&self, ctx: &RequestContext) -> Result<ConnectionStatus, AccountError> {
        let user_id = self.identity.resolve(ctx).await?;
        let current = self
            .store
            .get(&user_id)
            .await
            .map_err(AccountError::RefreshStore)?
            .ok_or_else(|| AccountError::NotConnected(user_id.clone()))?;

        let grant = self
            .tokens
            .refresh(&current.credentials.refresh_token)
            .await?;

        let credentials = MarketplaceCredentials::new(
            grant.access_token,
            grant
                .refresh_token
                .unwrap_or(current.credentials.refresh_token),
            grant.external_account_id,
        );
        self.store
            .upsert(&user_id, &credentials)
            .await
            .map_err(AccountError::RefreshStore)?;
        tracing::info!(
            user_id = %user_id,
            ml_user_id = %credentials.external_account_id,
            "marketplace tokens refreshed"
        );

        let record = self
            .store
            .get(&user_id)
            .await
            .map_err(AccountError::RefreshStore)?;
        Ok(record.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenGrant;
    use crate::store::MemoryCredentialStore;
    use async_trait::async_trait;

    struct FixedIdentity(Option<&'static str>);

    #[async_trait]
    impl IdentityResolver for FixedIdentity {
        async fn resolve(&self, _ctx: &RequestContext) -> Result<UserId, IdentityError> {
            self.0.map(UserId::from).ok_or(IdentityError::NoSession)
        }
    }

    /// Refresh grant with a configurable rotated refresh token.
    struct RefreshingTokens {
        rotated: Option<&'static str>,
        fail: bool,
    }

    #[async_trait]
    impl TokenExchangeClient for RefreshingTokens {
        async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, TokenExchangeError> {
            unreachable!("account operations never exchange codes")
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TokenExchangeError> {
            if self.fail {
                return Err(TokenExchangeError::Rejected {
                    status: 400,
                    payload: r#"{"error":"invalid_grant"}"#.to_string(),
                });
            }
            assert_eq!(refresh_token, "RT1");
            Ok(TokenGrant {
                access_token: "AT2".to_string(),
                refresh_token: self.rotated.map(str::to_string),
                external_account_id: "MLU1".to_string(),
                expires_in: Some(21600),
                scope: None,
            })
        }
    }

    async fn linked_store() -> Arc<MemoryCredentialStore> {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .upsert(
                &UserId::from("u1"),
                &MarketplaceCredentials::new("AT1", "RT1", "MLU1"),
            )
            .await
            .unwrap();
        store
    }

    fn service(
        identity: Option<&'static str>,
        tokens: RefreshingTokens,
        store: Arc<MemoryCredentialStore>,
    ) -> AccountService {
        AccountService::new(Arc::new(FixedIdentity(identity)), Arc::new(tokens), store)
    }

    fn tokens_ok() -> RefreshingTokens {
        RefreshingTokens {
            rotated: Some("RT2"),
            fail: false,
        }
    }

    #[tokio::test]
    async fn test_status_reports_link_without_tokens() {
        let svc = service(Some("u1"), tokens_ok(), linked_store().await);
        let status = svc.status(&RequestContext::default()).await.unwrap();
        assert!(status.connected);
        assert_eq!(status.external_account_id.as_deref(), Some("MLU1"));

        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("AT1"));
        assert!(!json.contains("RT1"));
    }

    #[tokio::test]
    async fn test_status_for_unlinked_user() {
        let svc = service(Some("u2"), tokens_ok(), linked_store().await);
        assert_eq!(
            svc.status(&RequestContext::default()).await.unwrap(),
            ConnectionStatus::disconnected()
        );
    }

    #[tokio::test]
    async fn test_status_requires_session() {
        let svc = service(None, tokens_ok(), linked_store().await);
        let err = svc.status(&RequestContext::default()).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let store = linked_store().await;
        let svc = service(Some("u1"), tokens_ok(), store.clone());
        svc.disconnect(&RequestContext::default()).await.unwrap();
        svc.disconnect(&RequestContext::default()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let store = linked_store().await;
        let svc = service(Some("u1"), tokens_ok(), store.clone());
        let status = svc.refresh(&RequestContext::default()).await.unwrap();
        assert!(status.connected);

        let record = store.get(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(
            record.credentials,
            MarketplaceCredentials::new("AT2", "RT2", "MLU1")
        );
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let store = linked_store().await;
        let tokens = RefreshingTokens {
            rotated: None,
            fail: false,
        };
        let svc = service(Some("u1"), tokens, store.clone());
        svc.refresh(&RequestContext::default()).await.unwrap();

        let record = store.get(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(record.credentials.refresh_token, "RT1");
        assert_eq!(record.credentials.access_token, "AT2");
    }

    #[tokio::test]
    async fn test_refresh_without_link_is_not_found() {
        let svc = service(Some("u2"), tokens_ok(), linked_store().await);
        let err = svc.refresh(&RequestContext::default()).await.unwrap_err();
        assert!(matches!(err, AccountError::NotConnected(_)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_rejection_leaves_record_untouched() {
        let store = linked_store().await;
        let tokens = RefreshingTokens {
            rotated: None,
            fail: true,
        };
        let svc = service(Some("u1"), tokens, store.clone());
        let err = svc.refresh(&RequestContext::default()).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let record = store.get(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(record.credentials.access_token, "AT1");
    }
}
