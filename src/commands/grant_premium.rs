use anyhow::Result;
use tracing::info;

use tabrelay_core::AppConfig;
use tabrelay_storage::UsageLedger;

use super::open_storage;

pub async fn run(config: AppConfig, user: String, customer: Option<String>) -> Result<()> {
    let storage = open_storage(&config).await?;

    storage.ensure_usage_record(&user).await?;
    storage.mark_paid(&user, customer.as_deref()).await?;

    info!(user_id = %user, "premium granted");
    println!("{} now has unlimited runs", user);
    Ok(())
}
