mod cli;
mod commands;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use tabrelay_core::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            commands::serve::run(config).await?;
        }
        Commands::Run {
            urls,
            user,
            repeat,
            delay,
            in_memory,
        } => {
            let delay = Duration::from_secs(delay.unwrap_or(config.batch.repeat_delay_seconds));
            commands::run::run(config, urls, user, repeat, delay, in_memory).await?;
        }
        Commands::Usage { user } => {
            commands::usage::run(config, user).await?;
        }
        Commands::GrantPremium { user, customer } => {
            commands::grant_premium::run(config, user, customer).await?;
        }
        Commands::Credentials { user, reveal } => {
            commands::credentials::run(config, user, reveal).await?;
        }
    }

    Ok(())
}
