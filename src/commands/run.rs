use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use tabrelay_core::AppConfig;
use tabrelay_registration::{BatchRunner, BatchSummary, ChaChaCipher, CredentialCipher, Orchestrator};
use tabrelay_storage::{AutomationStore, MemoryStore, UsageLedger};

use super::{load_cipher, open_storage, shutdown_on_ctrl_c};

pub async fn run(
    config: AppConfig,
    urls: Vec<String>,
    user: String,
    repeat: u32,
    delay: Duration,
    in_memory: bool,
) -> Result<()> {
    let summary = if in_memory {
        let cipher: Arc<dyn CredentialCipher> = Arc::new(ChaChaCipher::ephemeral());
        launch(&config, Arc::new(MemoryStore::new()), cipher, &urls, &user, repeat, delay).await?
    } else {
        let storage = Arc::new(open_storage(&config).await?);
        let cipher = load_cipher(&config)?;
        launch(&config, storage, cipher, &urls, &user, repeat, delay).await?
    };

    println!();
    for inv in &summary.invocations {
        let status = if inv.success { "ok  " } else { "FAIL" };
        println!(
            "  [{}] #{} {} {}",
            status,
            inv.repetition,
            inv.url,
            inv.email.as_deref().or(inv.error.as_deref()).unwrap_or_default()
        );
    }
    println!(
        "\nLaunched: {}  Succeeded: {}",
        summary.invocations.len(),
        summary.succeeded()
    );
    if let Some(reason) = &summary.stop_reason {
        println!("Stopped early: {}", reason);
    }

    Ok(())
}

async fn launch<S>(
    config: &AppConfig,
    store: Arc<S>,
    cipher: Arc<dyn CredentialCipher>,
    urls: &[String],
    user: &str,
    repeat: u32,
    delay: Duration,
) -> Result<BatchSummary>
where
    S: AutomationStore + 'static,
{
    store.ensure_usage_record(user).await?;
    let orchestrator = Orchestrator::from_config(config, store, cipher)?;
    let runner = BatchRunner::new(Arc::new(orchestrator), delay);
    Ok(runner.run(user, urls, repeat, &shutdown_on_ctrl_c()).await)
}
