//! # hubflow-core
//!
//! Shared types for the Hubflow marketplace connector:
//! - [`config`]: the server configuration (TOML file + environment overrides)
//! - [`credentials`]: the credential record linking a local user to a
//!   Mercado Livre account

pub mod config;
pub mod credentials;
pub mod error;

pub use config::{
    AppConfig, IdentityConfig, ProviderConfig, ServerConfig, StoreBackend, StoreConfig,
    SupabaseConfig, load_config,
};
pub use credentials::{CredentialRecord, MarketplaceCredentials, UserId};
pub use error::ConfigError;
