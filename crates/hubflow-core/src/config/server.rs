//! HTTP listener configuration.

use serde::Deserialize;

/// Configuration for the HTTP front door.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080".
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Application page the callback redirects back to, with
    /// `ml_connected=true` or `ml_error=true` appended.
    #[serde(default = "default_landing_page")]
    pub landing_page: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_landing_page() -> String {
    "/dashboard".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            landing_page: default_landing_page(),
        }
    }
}
