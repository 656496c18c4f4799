use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tabrelay_api::{AppState, JwtVerifier};
use tabrelay_core::AppConfig;
use tabrelay_registration::Orchestrator;

use super::{load_cipher, open_storage, shutdown_on_ctrl_c};

pub async fn run(config: AppConfig) -> Result<()> {
    let storage = Arc::new(open_storage(&config).await?);
    let cipher = load_cipher(&config)?;
    let verifier = JwtVerifier::hs256(&config.server.jwt_secret)?;
    let orchestrator = Orchestrator::from_config(&config, storage.clone(), cipher)?;

    info!(
        free_limit = config.quota.free_limit,
        model = %config.ai.model,
        "starting api"
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        usage: storage,
        verifier: Arc::new(verifier),
        shutdown: shutdown_on_ctrl_c(),
    };

    tabrelay_api::serve(&config.server.bind, state).await
}
