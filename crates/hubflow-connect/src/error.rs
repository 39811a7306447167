//! Error types for the connection flow.

use hubflow_core::UserId;
use thiserror::Error;

/// Longest provider/store payload kept in an error message.
const PAYLOAD_SNIPPET_LEN: usize = 512;

/// Failure to resolve the local user behind an inbound request.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No session cookie on the request.
    #[error("no session credential on request")]
    NoSession,

    /// The identity provider refused the session (expired, revoked, forged).
    #[error("identity provider rejected session (status {status})")]
    Rejected { status: u16 },

    /// The identity provider could not be reached.
    #[error("identity lookup failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The identity provider answered with something unusable.
    #[error("malformed identity response: {0}")]
    Malformed(String),
}

/// Failure of a server-to-server call to the provider's token endpoint.
#[derive(Debug, Error)]
pub enum TokenExchangeError {
    /// Network or TLS failure before a response was received.
    #[error("token endpoint unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// Non-success HTTP status. `payload` is the provider's error body.
    #[error("provider rejected token request (status {status}): {payload}")]
    Rejected { status: u16, payload: String },

    /// Success status but the body is not a usable token set.
    #[error("malformed token response: {0}")]
    Malformed(String),
}

/// Failure of the administrative credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Local database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure when opening the local database.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The hosted store could not be reached.
    #[error("store unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    /// The hosted store refused the request.
    #[error("store rejected request (status {status}): {payload}")]
    Rejected { status: u16, payload: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Why a callback did not end with stored credentials.
///
/// Every step of the callback has exactly one variant here; see
/// [`crate::exchanger::to_response`] for how each maps to HTTP.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// `code` query parameter absent, empty or repeated.
    #[error("authorization code missing or malformed")]
    MissingAuthorizationCode,

    /// The local user could not be identified from the session.
    #[error("could not resolve local user: {0}")]
    UnresolvedIdentity(#[from] IdentityError),

    /// The provider did not hand out tokens for the code.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(#[from] TokenExchangeError),

    /// Tokens were obtained but could not be written.
    #[error("failed to persist credentials for user {user_id}: {source}")]
    PersistenceFailed {
        user_id: UserId,
        #[source]
        source: StoreError,
    },
}

/// Trim an upstream body so it can be embedded in an error message.
pub(crate) fn payload_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= PAYLOAD_SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(PAYLOAD_SNIPPET_LEN).collect();
    out.push_str("...");
    out
}
