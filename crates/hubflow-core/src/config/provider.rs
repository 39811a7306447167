//! Mercado Livre OAuth application configuration.

use secrecy::SecretString;
use serde::Deserialize;

/// Registered OAuth application on the marketplace side.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Public application id (`MERCADO_LIVRE_APP_ID`).
    #[serde(default)]
    pub client_id: String,

    /// Application secret (`MERCADO_LIVRE_CLIENT_SECRET`).
    #[serde(default)]
    pub client_secret: Option<SecretString>,

    /// Callback address registered with the provider. The exchange is
    /// rejected upstream unless this matches the registration exactly.
    #[serde(default)]
    pub redirect_uri: String,

    /// Consent screen the initiator redirects to.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    /// Server-to-server token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Timeout applied to every outbound HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_authorize_url() -> String {
    "https://auth.mercadolivre.com.br/authorization".to_string()
}

fn default_token_url() -> String {
    "https://api.mercadolibre.com/oauth/token".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: String::new(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
