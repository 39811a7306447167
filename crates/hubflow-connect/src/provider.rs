//! Server-to-server calls to the marketplace token endpoint.
//!
//! Both grants are one-shot: authorization codes are single-use, so a retry
//! after a provider-side failure would only fail again with a less useful
//! error.

use async_trait::async_trait;
use hubflow_core::ProviderConfig;
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{TokenExchangeError, payload_snippet};

/// Token set returned by the provider.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent on some refresh responses; the previous token stays valid then.
    pub refresh_token: Option<String>,
    /// Provider-side account the tokens are scoped to.
    pub external_account_id: String,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("external_account_id", &self.external_account_id)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Outbound capability: trade a code (or refresh token) for tokens.
#[async_trait]
pub trait TokenExchangeClient: Send + Sync {
    /// `grant_type=authorization_code`. The returned grant always carries a
    /// refresh token.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, TokenExchangeError>;

    /// `grant_type=refresh_token`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TokenExchangeError>;
}

/// Mercado Livre OAuth token endpoint client.
pub struct MercadoLivreClient {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
}

impl MercadoLivreClient {
    pub fn new(
        http: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Build from configuration. Returns `None` when the client secret is
    /// absent.
    pub fn from_config(http: Client, cfg: &ProviderConfig) -> Option<Self> {
        let secret = cfg.client_secret.clone()?;
        Some(Self::new(
            http,
            cfg.token_url.trim(),
            cfg.client_id.trim(),
            secret,
            cfg.redirect_uri.trim(),
        ))
    }

    async fn post_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse, TokenExchangeError> {
        let response = self
            .http
            .post(&self.token_url)
            .header(header::ACCEPT, "application/json")
            .form(form)
            .send()
            .await
            .map_err(TokenExchangeError::Transport)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(TokenExchangeError::Transport)?;

        if !status.is_success() {
            return Err(TokenExchangeError::Rejected {
                status: status.as_u16(),
                payload: payload_snippet(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| TokenExchangeError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TokenExchangeClient for MercadoLivreClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, TokenExchangeError> {
        let secret = self.client_secret.expose_secret().as_str();
        let raw = self
            .post_form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", secret),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;

        let grant = raw.into_grant()?;
        if grant.refresh_token.is_none() {
            return Err(TokenExchangeError::Malformed(
                "missing refresh_token".to_string(),
            ));
        }
        Ok(grant)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TokenExchangeError> {
        let secret = self.client_secret.expose_secret().as_str();
        let raw = self
            .post_form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", secret),
                ("refresh_token", refresh_token),
            ])
            .await?;
        raw.into_grant()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default, deserialize_with = "account_id")]
    user_id: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

impl TokenResponse {
    fn into_grant(self) -> Result<TokenGrant, TokenExchangeError> {
        let access_token = non_empty(self.access_token)
            .ok_or_else(|| TokenExchangeError::Malformed("missing access_token".to_string()))?;
        let external_account_id = non_empty(self.user_id)
            .ok_or_else(|| TokenExchangeError::Malformed("missing user_id".to_string()))?;

        Ok(TokenGrant {
            access_token,
            refresh_token: non_empty(self.refresh_token),
            external_account_id,
            expires_in: self.expires_in,
            scope: self.scope,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The provider sends `user_id` as a JSON number; accept strings too.
fn account_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    }))
}
