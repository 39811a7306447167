//! Authorization initiator: sends the browser to the provider consent screen.

use axum::response::Response;
use hubflow_core::{ConfigError, ProviderConfig};
use url::Url;

use crate::response::found;

/// Holds the fully-formed authorization URL, built once at startup.
#[derive(Debug, Clone)]
pub struct AuthorizationInitiator {
    authorization_url: Url,
}

impl AuthorizationInitiator {
    /// Build `{authorize_url}?response_type=code&client_id=..&redirect_uri=..`.
    pub fn new(
        authorize_url: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<Self, ConfigError> {
        let mut url = Url::parse(authorize_url.trim()).map_err(|e| ConfigError::Invalid {
            key: "provider.authorize_url",
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .clear()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id.trim())
            .append_pair("redirect_uri", redirect_uri.trim());
        Ok(Self {
            authorization_url: url,
        })
    }

    pub fn from_config(cfg: &ProviderConfig) -> Result<Self, ConfigError> {
        Self::new(&cfg.authorize_url, &cfg.client_id, &cfg.redirect_uri)
    }

    pub fn authorization_url(&self) -> &str {
        self.authorization_url.as_str()
    }

    /// `302` to the provider.
    pub fn redirect(&self) -> Response {
        found(self.authorization_url.as_str())
    }
}
