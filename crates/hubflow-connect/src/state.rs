//! Shared state for the connection routes.

use axum::http::HeaderMap;
use hubflow_core::AppConfig;
use std::sync::Arc;

use crate::account::AccountService;
use crate::exchanger::CallbackExchanger;
use crate::identity::{IdentityResolver, RequestContext};
use crate::initiator::AuthorizationInitiator;
use crate::provider::TokenExchangeClient;
use crate::store::AdminCredentialStore;

/// Request-independent settings for the routes.
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    /// Cookie carrying the identity provider's access token.
    pub session_cookie: String,
    /// Where the browser lands after the callback.
    pub landing_page: String,
}

impl ConnectSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            session_cookie: cfg.identity.session_cookie.clone(),
            landing_page: cfg.server.landing_page.clone(),
        }
    }
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            session_cookie: "sb-access-token".to_string(),
            landing_page: "/dashboard".to_string(),
        }
    }
}

/// Shared application state for the connection routes.
#[derive(Clone)]
pub struct ConnectState {
    inner: Arc<ConnectStateInner>,
}

struct ConnectStateInner {
    initiator: AuthorizationInitiator,
    exchanger: CallbackExchanger,
    accounts: AccountService,
    settings: ConnectSettings,
}

impl ConnectState {
    /// Wire the flow from its collaborators.
    pub fn new(
        initiator: AuthorizationInitiator,
        identity: Arc<dyn IdentityResolver>,
        tokens: Arc<dyn TokenExchangeClient>,
        store: Arc<dyn AdminCredentialStore>,
        settings: ConnectSettings,
    ) -> Self {
        let exchanger = CallbackExchanger::new(identity.clone(), tokens.clone(), store.clone());
        let accounts = AccountService::new(identity, tokens, store);
        Self {
            inner: Arc::new(ConnectStateInner {
                initiator,
                exchanger,
                accounts,
                settings,
            }),
        }
    }

    pub fn initiator(&self) -> &AuthorizationInitiator {
        &self.inner.initiator
    }

    pub fn exchanger(&self) -> &CallbackExchanger {
        &self.inner.exchanger
    }

    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    pub fn landing_page(&self) -> &str {
        &self.inner.settings.landing_page
    }

    /// Build the identity context for an inbound request.
    pub fn request_context(&self, headers: &HeaderMap) -> RequestContext {
        RequestContext::from_headers(headers, &self.inner.settings.session_cookie)
    }
}
