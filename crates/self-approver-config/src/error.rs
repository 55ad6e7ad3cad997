use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but is not valid TOML for `AppConfig`
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A config file was found or named but could not be read
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The listen address cannot be parsed as `host:port`
    #[error("Invalid listen address {0:?}")]
    InvalidListenAddress(String),

    /// `GITHUB_APP_ID` is not a number
    #[error("Invalid GitHub App id {0:?}")]
    InvalidAppId(String),

    /// No GitHub App id in the config file or `GITHUB_APP_ID`
    #[error("No GitHub App id found. Set GITHUB_APP_ID or app_id")]
    MissingAppId,

    /// No private key in `GITHUB_APP_PRIVATE_KEY` and no key path configured
    #[error(
        "No GitHub App private key found. Set GITHUB_APP_PRIVATE_KEY or GITHUB_APP_PRIVATE_KEY_PATH"
    )]
    MissingPrivateKey,

    /// The configured private key file could not be read
    #[error("Failed to read GitHub App private key {path:?}: {source}")]
    ReadPrivateKey {
        path: PathBuf,
        source: std::io::Error,
    },
}
