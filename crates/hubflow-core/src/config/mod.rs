//! Configuration types for the Hubflow connector.
//!
//! Configuration is read from an optional TOML file and then overridden by
//! environment variables, which is how the hosted deployment provides every
//! secret. [`AppConfig::validate`] must pass before the server binds.
//!
//! # Environment variables
//!
//! | variable                        | field                        |
//! |---------------------------------|------------------------------|
//! | `MERCADO_LIVRE_APP_ID`          | `provider.client_id`         |
//! | `MERCADO_LIVRE_CLIENT_SECRET`   | `provider.client_secret`     |
//! | `MERCADO_LIVRE_REDIRECT_URI`    | `provider.redirect_uri`      |
//! | `SUPABASE_URL`                  | `supabase.url`               |
//! | `SUPABASE_ANON_KEY`             | `supabase.anon_key`          |
//! | `SUPABASE_SERVICE_ROLE_KEY`     | `supabase.service_role_key`  |
//! | `HUBFLOW_BIND`                  | `server.bind`                |
//! | `HUBFLOW_LANDING_PAGE`          | `server.landing_page`        |
//! | `HUBFLOW_STORE_BACKEND`         | `store.backend`              |
//!
//! `VITE_SUPABASE_URL` and `VITE_SUPABASE_ANON_KEY` are accepted as
//! fallbacks so the frontend's environment can be shared as-is.

pub mod provider;
pub mod server;
pub mod store;
pub mod supabase;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

pub use provider::ProviderConfig;
pub use server::ServerConfig;
pub use store::{StoreBackend, StoreConfig};
pub use supabase::{IdentityConfig, SupabaseConfig};

/// Complete connector configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Parse a TOML file. Absent sections fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        if let Some(v) = get(&["MERCADO_LIVRE_APP_ID"]) {
            self.provider.client_id = v;
        }
        if let Some(v) = get(&["MERCADO_LIVRE_CLIENT_SECRET"]) {
            self.provider.client_secret = Some(SecretString::new(v));
        }
        if let Some(v) = get(&["MERCADO_LIVRE_REDIRECT_URI"]) {
            self.provider.redirect_uri = v;
        }
        if let Some(v) = get(&["SUPABASE_URL", "VITE_SUPABASE_URL"]) {
            self.supabase.url = v;
        }
        if let Some(v) = get(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"]) {
            self.supabase.anon_key = Some(SecretString::new(v));
        }
        if let Some(v) = get(&["SUPABASE_SERVICE_ROLE_KEY"]) {
            self.supabase.service_role_key = Some(SecretString::new(v));
        }
        if let Some(v) = get(&["HUBFLOW_BIND"]) {
            self.server.bind = v;
        }
        if let Some(v) = get(&["HUBFLOW_LANDING_PAGE"]) {
            self.server.landing_page = v;
        }
        if let Some(v) = get(&["HUBFLOW_STORE_BACKEND"]) {
            self.store.backend = match v.to_ascii_lowercase().as_str() {
                "supabase" => StoreBackend::Supabase,
                "sqlite" => StoreBackend::Sqlite,
                "memory" => StoreBackend::Memory,
                other => {
                    return Err(ConfigError::Invalid {
                        key: "store.backend",
                        reason: format!("unknown backend '{other}'"),
                    });
                }
            };
        }
        Ok(())
    }

    /// Check that every value the connector needs at runtime is present and
    /// well-formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("provider.client_id"));
        }
        if !has_secret(&self.provider.client_secret) {
            return Err(ConfigError::Missing("provider.client_secret"));
        }
        if self.provider.redirect_uri.trim().is_empty() {
            return Err(ConfigError::Missing("provider.redirect_uri"));
        }
        parse_absolute("provider.redirect_uri", &self.provider.redirect_uri)?;
        parse_absolute("provider.authorize_url", &self.provider.authorize_url)?;
        parse_absolute("provider.token_url", &self.provider.token_url)?;
        if self.provider.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "provider.request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.supabase.url.trim().is_empty() {
            return Err(ConfigError::Missing("supabase.url"));
        }
        parse_absolute("supabase.url", &self.supabase.url)?;
        if !has_secret(&self.supabase.anon_key) {
            return Err(ConfigError::Missing("supabase.anon_key"));
        }

        if self.identity.session_cookie.trim().is_empty() {
            return Err(ConfigError::Missing("identity.session_cookie"));
        }
        if self.server.landing_page.trim().is_empty() {
            return Err(ConfigError::Missing("server.landing_page"));
        }

        match self.store.backend {
            StoreBackend::Supabase => {
                if !has_secret(&self.supabase.service_role_key) {
                    return Err(ConfigError::Missing("supabase.service_role_key"));
                }
            }
            StoreBackend::Sqlite => {
                if self.store.sqlite_path.trim().is_empty() {
                    return Err(ConfigError::Missing("store.sqlite_path"));
                }
            }
            StoreBackend::Memory => {}
        }

        Ok(())
    }
}

/// Load configuration: explicit path, then `HUBFLOW_CONFIG`, then
/// `hubflow.toml` in the working directory if present; environment
/// variables are applied on top.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = match config_path(explicit) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };
    cfg.apply_overrides(|key| env::var(key).ok())?;
    Ok(cfg)
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Ok(p) = env::var("HUBFLOW_CONFIG") {
        return Some(PathBuf::from(p));
    }
    let fallback = PathBuf::from("hubflow.toml");
    fallback.exists().then_some(fallback)
}

fn has_secret(secret: &Option<SecretString>) -> bool {
    secret
        .as_ref()
        .is_some_and(|s| !s.expose_secret().trim().is_empty())
}

fn parse_absolute(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
