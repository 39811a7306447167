//! Resolution of the local user behind an inbound request.

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use hubflow_core::{SupabaseConfig, UserId};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::IdentityError;

/// What the identity resolver may look at from an inbound request.
#[derive(Clone, Default)]
pub struct RequestContext {
    session_token: Option<SecretString>,
}

impl RequestContext {
    /// Pull the session cookie named `cookie_name` out of the request headers.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        let session_token = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookies| extract_cookie(cookies, cookie_name))
            .map(SecretString::new);
        Self { session_token }
    }

    pub fn with_session_token(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(SecretString::new(token.into())),
        }
    }

    pub fn session_token(&self) -> Option<&SecretString> {
        self.session_token.as_ref()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("has_session", &self.session_token.is_some())
            .finish()
    }
}

/// Extract a cookie value from a `Cookie` header.
fn extract_cookie(cookies: &str, name: &str) -> Option<String> {
    for cookie in cookies.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Read-only capability: who is making this request?
///
/// Implementations must never write anything; credential writes go through
/// [`crate::store::AdminCredentialStore`].
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, ctx: &RequestContext) -> Result<UserId, IdentityError>;
}

/// Resolves sessions against the Supabase auth API (`GET /auth/v1/user`).
pub struct SupabaseIdentityResolver {
    http: Client,
    user_endpoint: String,
    anon_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: Option<String>,
}

impl SupabaseIdentityResolver {
    pub fn new(http: Client, base_url: &str, anon_key: SecretString) -> Self {
        Self {
            http,
            user_endpoint: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            anon_key,
        }
    }

    /// Build from configuration. Returns `None` when the anon key is absent.
    pub fn from_config(http: Client, cfg: &SupabaseConfig) -> Option<Self> {
        let anon_key = cfg.anon_key.clone()?;
        Some(Self::new(http, &cfg.url, anon_key))
    }
}

#[async_trait]
impl IdentityResolver for SupabaseIdentityResolver {
    async fn resolve(&self, ctx: &RequestContext) -> Result<UserId, IdentityError> {
        let token = ctx.session_token().ok_or(IdentityError::NoSession)?;

        let response = self
            .http
            .get(&self.user_endpoint)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(IdentityError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
            });
        }

        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))?;

        user.id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(UserId::new)
            .ok_or_else(|| IdentityError::Malformed("user id missing".to_string()))
    }
}
