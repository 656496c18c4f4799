use anyhow::Result;

use tabrelay_core::AppConfig;
use tabrelay_storage::UsageLedger;

use super::open_storage;

pub async fn run(config: AppConfig, user: String) -> Result<()> {
    let storage = open_storage(&config).await?;

    let Some(record) = storage.usage(&user).await? else {
        println!("No usage record for {}", user);
        return Ok(());
    };

    let left = if record.has_paid {
        "unlimited".to_string()
    } else {
        config.quota.free_limit.saturating_sub(record.usage_count).to_string()
    };

    println!("User:       {}", record.user_id);
    println!("Runs used:  {}", record.usage_count);
    println!("Runs left:  {}", left);
    println!("Premium:    {}", record.has_paid);
    if let Some(last) = record.last_used_at {
        println!("Last used:  {}", last.to_rfc3339());
    }

    Ok(())
}
