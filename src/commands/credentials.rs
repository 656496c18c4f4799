use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use tabrelay_core::AppConfig;
use tabrelay_registration::CredentialStore;

use super::{load_cipher, open_storage};

pub async fn run(config: AppConfig, user: String, reveal: Option<Uuid>) -> Result<()> {
    let storage = Arc::new(open_storage(&config).await?);
    let store = CredentialStore::new(storage, load_cipher(&config)?);

    if let Some(id) = reveal {
        match store.reveal(&user, id).await? {
            Some((credential, password)) => {
                println!("Site:     {}", credential.site_name);
                println!("URL:      {}", credential.url);
                println!("Email:    {}", credential.email);
                println!("Password: {}", password);
            }
            None => println!("No credential {} for {}", id, user),
        }
        return Ok(());
    }

    let credentials = store.list(&user).await?;
    println!("{} saved credentials:\n", credentials.len());
    for c in credentials {
        let state = if c.successfully_registered {
            "registered"
        } else if c.manual_needed {
            "manual"
        } else {
            "-"
        };
        println!(
            "  {} [{}] {} {} ({})",
            c.id,
            state,
            c.site_name,
            c.email,
            c.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
