pub mod credentials;
pub mod grant_premium;
pub mod run;
pub mod serve;
pub mod usage;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tabrelay_core::AppConfig;
use tabrelay_registration::{ChaChaCipher, CredentialCipher};
use tabrelay_storage::Storage;

/// Connects to Postgres and applies the embedded migrations.
pub async fn open_storage(config: &AppConfig) -> Result<Storage> {
    if config.database.postgres_url.trim().is_empty() {
        anyhow::bail!("no database configured (set [database].postgres_url or DATABASE_URL)");
    }

    let storage = Storage::with_pool_size(&config.database.postgres_url, config.database.max_connections)
        .await
        .context("connecting to postgres")?;
    storage.run_migrations().await?;
    Ok(storage)
}

pub fn load_cipher(config: &AppConfig) -> Result<Arc<dyn CredentialCipher>> {
    Ok(Arc::new(ChaChaCipher::from_config(&config.crypto)?))
}

/// Token cancelled on the first Ctrl-C.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                trigger.cancel();
            }
            Err(e) => warn!(error = %e, "could not listen for ctrl-c"),
        }
    });
    token
}
