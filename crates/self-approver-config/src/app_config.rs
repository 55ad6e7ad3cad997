//! Application configuration
//!
//! Configuration loaded from .self-approver.toml, then overridden by
//! environment variables.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from .self-approver.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Name shown in the liveness banner
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Name of the check run used as progress indicator
    #[serde(default = "default_check_run_name")]
    pub check_run_name: String,

    /// Body of the approving review
    #[serde(default = "default_approval_message")]
    pub approval_message: String,

    /// Address the webhook server binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// GitHub API base URL, for GitHub Enterprise hosts
    #[serde(default)]
    pub api_url: Option<String>,

    /// Numeric id of the GitHub App the service runs as
    #[serde(default)]
    pub app_id: Option<u64>,

    /// Path to the PEM encoded private key of the GitHub App
    #[serde(default)]
    pub private_key_path: Option<String>,
}

/// Credentials of the GitHub App the service authenticates as
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    pub app_id: u64,
    /// PEM encoded RSA private key
    pub private_key: String,
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

fn default_app_name() -> String {
    "Self Approver".to_string()
}

fn default_check_run_name() -> String {
    "Self Approver".to_string()
}

fn default_approval_message() -> String {
    "Approved by Self Approver".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            check_run_name: default_check_run_name(),
            approval_message: default_approval_message(),
            listen: default_listen(),
            api_url: None,
            app_id: None,
            private_key_path: None,
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then home directory, or use defaults,
    /// then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        if std::env::var("GITHUB_APP_ID").is_err() {
            match dotenvy::dotenv() {
                Ok(path) => log::debug!("Loaded .env file from: {:?}", path),
                Err(_) => log::debug!(".env file not found, will rely on environment variables"),
            }
        }

        let mut config = match crate::load_config_file()? {
            Some(source) => {
                let config = Self::from_toml(&source.content)?;
                log::info!("Loaded app config from {}", source.path.display());
                config
            }
            None => {
                log::debug!("Using default app config");
                Self::default()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config file, filling missing fields with defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from `SELF_APPROVER_*` and `GITHUB_*` variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup("SELF_APPROVER_LISTEN") {
            self.listen = listen;
        }
        if let Some(name) = lookup("SELF_APPROVER_CHECK_RUN_NAME") {
            self.check_run_name = name;
        }
        if let Some(message) = lookup("SELF_APPROVER_APPROVAL_MESSAGE") {
            self.approval_message = message;
        }
        if let Some(url) = lookup("GITHUB_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(id) = lookup("GITHUB_APP_ID") {
            let id = id.trim();
            self.app_id = Some(
                id.parse()
                    .map_err(|_| ConfigError::InvalidAppId(id.to_string()))?,
            );
        }
        if let Some(path) = lookup("GITHUB_APP_PRIVATE_KEY_PATH") {
            self.private_key_path = Some(path);
        }
        Ok(())
    }

    /// Resolve the GitHub App credentials from the process environment
    pub fn app_credentials(&self) -> Result<AppCredentials, ConfigError> {
        self.app_credentials_with(|key| std::env::var(key).ok())
    }

    /// Resolve the GitHub App credentials
    ///
    /// The private key is taken from `GITHUB_APP_PRIVATE_KEY` when set and
    /// non-empty, otherwise it is read from `private_key_path`.
    pub fn app_credentials_with<F>(&self, lookup: F) -> Result<AppCredentials, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_id = self.app_id.ok_or(ConfigError::MissingAppId)?;

        let inline_key = lookup("GITHUB_APP_PRIVATE_KEY")
            .filter(|key| !key.trim().is_empty())
            // single-line env values carry escaped newlines
            .map(|key| key.replace("\\n", "\n"));

        let private_key = match (inline_key, &self.private_key_path) {
            (Some(key), _) => key,
            (None, Some(path)) => {
                let path = PathBuf::from(path);
                std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::ReadPrivateKey { path, source })?
            }
            (None, None) => return Err(ConfigError::MissingPrivateKey),
        };

        Ok(AppCredentials {
            app_id,
            private_key,
        })
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddress(self.listen.clone()))
    }
}
