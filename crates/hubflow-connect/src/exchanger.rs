//! Callback exchanger: turns the provider's redirect into stored credentials.
//!
//! Per invocation the flow is strictly sequential:
//!
//! ```text
//! Start -> code present? -> identity resolved? -> tokens exchanged? -> persisted?
//!       -> Redirect(success | failure)
//! ```
//!
//! Each branch point has exactly one failure exit ([`ExchangeError`]), and
//! [`to_response`] is the only place those are mapped to HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hubflow_core::{MarketplaceCredentials, UserId};
use std::sync::Arc;

use crate::error::{ExchangeError, TokenExchangeError};
use crate::identity::{IdentityResolver, RequestContext};
use crate::provider::TokenExchangeClient;
use crate::response::{found, landing_with_flag};
use crate::store::AdminCredentialStore;

/// Query flag appended to the landing page on success.
pub const CONNECTED_FLAG: &str = "ml_connected";
/// Query flag appended to the landing page on failure after identity resolution.
pub const ERROR_FLAG: &str = "ml_error";

const MISSING_CODE_MESSAGE: &str = "Invalid or missing authorization code.";
const UNRESOLVED_IDENTITY_MESSAGE: &str = "Could not identify the user. Please sign in again.";

/// Parameters of the provider's redirect.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    code: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string. `code` counts as present only when it occurs
    /// exactly once with a non-empty value.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut codes = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()))
            .into_iter()
            .flatten()
            .filter(|(key, _)| key == "code")
            .map(|(_, value)| value.trim().to_string());

        let code = match (codes.next(), codes.next()) {
            (Some(code), None) if !code.is_empty() => Some(code),
            _ => None,
        };
        Self { code }
    }

    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.is_empty())
    }
}

/// Result of a successful callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedAccount {
    pub user_id: UserId,
    pub external_account_id: String,
}

/// Runs the five callback steps against injected collaborators.
#[derive(Clone)]
pub struct CallbackExchanger {
    identity: Arc<dyn IdentityResolver>,
    tokens: Arc<dyn TokenExchangeClient>,
    store: Arc<dyn AdminCredentialStore>,
}

impl CallbackExchanger {
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

    /// Run the callback. Failures are logged here with full detail; the
    /// caller only needs [`to_response`].
    pub async fn exchange(
        &self,
        params: &CallbackParams,
        ctx: &RequestContext,
    ) -> Result<ConnectedAccount, ExchangeError> {
        let result = self.run(params, ctx).await;
        match &result {
            Ok(account) => tracing::info!(
                user_id = %account.user_id,
                ml_user_id = %account.external_account_id,
                "marketplace account connected"
            ),
            Err(
                err @ (ExchangeError::MissingAuthorizationCode
                | ExchangeError::UnresolvedIdentity(_)),
            ) => {
                tracing::warn!(error = %err, "rejected marketplace callback");
            }
            Err(err) => {
                tracing::error!(error = %err, "marketplace callback failed");
            }
        }
        result
    }

    async fn run(
        &self,
        params: &CallbackParams,
        ctx: &RequestContext,
    ) -> Result<ConnectedAccount, ExchangeError> {
        // 1. No external call without a code.
        let code = params.code().ok_or(ExchangeError::MissingAuthorizationCode)?;

        // 2. The local user must be known before anything can be persisted.
        let user_id = self.identity.resolve(ctx).await?;

        // 3. Single-use code: never retried.
        let grant = self.tokens.exchange_code(code).await?;
        let refresh_token = grant.refresh_token.ok_or_else(|| {
            TokenExchangeError::Malformed("missing refresh_token".to_string())
        })?;
        let credentials = MarketplaceCredentials::new(
            grant.access_token,
            refresh_token,
            grant.external_account_id,
        );

        // 4. Exactly one write, keyed by the resolved user.
        self.store
            .upsert(&user_id, &credentials)
            .await
            .map_err(|source| ExchangeError::PersistenceFailed {
                user_id: user_id.clone(),
                source,
            })?;

        Ok(ConnectedAccount {
            user_id,
            external_account_id: credentials.external_account_id,
        })
    }
}

/// Map a callback result to the browser-visible response.
///
/// Request faults get a distinct status and plain text; backend faults
/// collapse into the failure redirect so no provider or store detail reaches
/// the browser.
pub fn to_response(result: &Result<ConnectedAccount, ExchangeError>, landing_page: &str) -> Response {
    match result {
        Ok(_) => found(&landing_with_flag(landing_page, CONNECTED_FLAG)),
        Err(ExchangeError::MissingAuthorizationCode) => {
            (StatusCode::BAD_REQUEST, MISSING_CODE_MESSAGE).into_response()
        }
        Err(ExchangeError::UnresolvedIdentity(_)) => {
            (StatusCode::UNAUTHORIZED, UNRESOLVED_IDENTITY_MESSAGE).into_response()
        }
        Err(ExchangeError::TokenExchangeFailed(_) | ExchangeError::PersistenceFailed { .. }) => {
            found(&landing_with_flag(landing_page, ERROR_FLAG))
        }
    }
}
