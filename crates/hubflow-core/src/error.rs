//! Error types for the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are startup faults: the server refuses to bind when any is
/// returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::AppConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required value is absent from both the file and the environment.
    #[error("missing required configuration value `{0}`")]
    Missing(&'static str),

    /// A value is present but unusable.
    #[error("invalid configuration value `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
