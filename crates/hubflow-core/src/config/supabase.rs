//! Hosted identity provider and profile store (Supabase).

use secrecy::SecretString;
use serde::Deserialize;

/// Connection parameters for the Supabase project.
///
/// The anon key is used for end-user session lookups; the service-role key
/// is only ever handed to the administrative credential store.
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: String,

    /// Public anon key (`SUPABASE_ANON_KEY`).
    #[serde(default)]
    pub anon_key: Option<SecretString>,

    /// Service-role key (`SUPABASE_SERVICE_ROLE_KEY`).
    #[serde(default)]
    pub service_role_key: Option<SecretString>,

    /// Table holding one profile row per user.
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,
}

fn default_profiles_table() -> String {
    "profiles".to_string()
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: None,
            service_role_key: None,
            profiles_table: default_profiles_table(),
        }
    }
}

/// How the local user is recognised on inbound requests.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Cookie carrying the identity provider's access token.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

fn default_session_cookie() -> String {
    "sb-access-token".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            session_cookie: default_session_cookie(),
        }
    }
}
