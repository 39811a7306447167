//! Credential types for a linked marketplace account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a local (identity-provider) user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The token set written for a user after a successful exchange or refresh.
///
/// Serialised field names match the `profiles` columns of the hosted store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceCredentials {
    #[serde(rename = "ml_access_token")]
    pub access_token: String,
    #[serde(rename = "ml_refresh_token")]
    pub refresh_token: String,
    #[serde(rename = "ml_user_id")]
    pub external_account_id: String,
}

impl MarketplaceCredentials {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        external_account_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            external_account_id: external_account_id.into(),
        }
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for MarketplaceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketplaceCredentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("external_account_id", &self.external_account_id)
            .finish()
    }
}

/// A persisted credential record, one per linked local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub credentials: MarketplaceCredentials,
    /// Time of the last write, when the backend tracks it.
    pub updated_at: Option<DateTime<Utc>>,
}
