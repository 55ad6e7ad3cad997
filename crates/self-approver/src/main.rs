use std::sync::Arc;

use gh_client::ClientManager;
use self_approver::server::{self, AppState};
use self_approver::{logger, ApprovalEngine, EngineSettings};
use self_approver_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();

    let config = AppConfig::load()?;
    log::info!("Starting {}", config.app_name);

    let credentials = config.app_credentials()?;
    let manager = ClientManager::for_app(
        credentials.app_id,
        &credentials.private_key,
        config.api_url.as_deref(),
    )?;
    let reviewer = manager.app_login().await?;
    log::info!("Authenticated as {}", reviewer);

    let settings = EngineSettings {
        reviewer: Some(reviewer),
        ..EngineSettings::from(&config)
    };
    let engine = ApprovalEngine::new(Arc::new(manager), settings);

    let addr = config.listen_addr()?;
    server::serve(addr, server::router(AppState::new(engine, &config.app_name))).await?;

    log::info!("Exiting {}", config.app_name);
    Ok(())
}
