//! Credential store configuration.

use serde::Deserialize;

/// Which backend holds the credential records.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// The `profiles` table of the hosted Supabase project (PostgREST).
    #[default]
    Supabase,
    /// A local SQLite file.
    Sqlite,
    /// Process memory; records are lost on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path of the SQLite file when `backend = "sqlite"`.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

fn default_sqlite_path() -> String {
    "data/hubflow.sqlite".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: default_sqlite_path(),
        }
    }
}
