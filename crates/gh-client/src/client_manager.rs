//! GitHub App installation client manager
//!
//! The service authenticates as a GitHub App. Every webhook names the
//! installation it was delivered for, and API calls for that event are made
//! with the installation's token. Clients are lazily created and cached per
//! installation.

use crate::{GitHubClient, OctocrabClient};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use octocrab::models::{AppId, InstallationId};
use octocrab::Octocrab;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Hands out the client to use for one GitHub App installation
pub trait ClientProvider: Send + Sync {
    /// Client authenticated as the given installation
    fn client_for(&self, installation_id: u64) -> Result<Arc<dyn GitHubClient>>;
}

/// Manages installation clients for one GitHub App
///
/// # Example
///
/// ```rust,ignore
/// use gh_client::{ClientManager, ClientProvider};
///
/// let manager = ClientManager::for_app(12345, &private_key_pem, None)?;
/// let login = manager.app_login().await?;
/// let client = manager.client_for(installation_id)?;
/// ```
pub struct ClientManager {
    /// Client authenticated with the App JWT
    app: Octocrab,
    /// Cached clients per installation
    clients: Mutex<HashMap<u64, Arc<OctocrabClient>>>,
}

impl ClientManager {
    /// Create a manager for the App with the given id and RSA private key
    ///
    /// # Arguments
    ///
    /// * `app_id` - Numeric GitHub App id
    /// * `private_key_pem` - PEM encoded private key of the App
    /// * `api_url` - Base URL of a GitHub Enterprise API (None = api.github.com)
    pub fn for_app(app_id: u64, private_key_pem: &str, api_url: Option<&str>) -> Result<Self> {
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .context("Invalid GitHub App private key")?;

        let mut builder = Octocrab::builder().app(AppId(app_id), key);
        if let Some(url) = api_url {
            builder = builder.base_uri(url).context("Failed to set base URI")?;
        }

        let app = builder.build().context("Failed to build Octocrab client")?;
        info!("GitHub App client created for app {}", app_id);

        Ok(Self {
            app,
            clients: Mutex::new(HashMap::new()),
        })
    }

    /// Login the App's reviews are authored under, e.g. `self-approver[bot]`
    pub async fn app_login(&self) -> Result<String> {
        let app = self
            .app
            .current()
            .app()
            .await
            .context("Failed to fetch GitHub App")?;
        let slug = app
            .slug
            .ok_or_else(|| anyhow!("GitHub App has no slug"))?;

        Ok(format!("{}[bot]", slug))
    }
}

impl ClientProvider for ClientManager {
    fn client_for(&self, installation_id: u64) -> Result<Arc<dyn GitHubClient>> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| anyhow!("Installation client cache poisoned"))?;

        if let Some(client) = clients.get(&installation_id) {
            return Ok(client.clone());
        }

        debug!("Creating client for installation {}", installation_id);
        let octocrab = self
            .app
            .installation(InstallationId(installation_id))
            .with_context(|| format!("Failed to create client for installation {}", installation_id))?;
        let client = Arc::new(OctocrabClient::new(Arc::new(octocrab)));
        clients.insert(installation_id, client.clone());

        Ok(client)
    }
}
