//! blahrg-bot - Telegram voice clip bot
//!
//! Startup sequence:
//! 1. Resolve and load the TOML configuration (fatal if missing or malformed)
//! 2. Initialize tracing
//! 3. Open the clip store and media directory
//! 4. Verify the bot token, then long-poll until Ctrl-C

use anyhow::{Context, Result};
use blahrg_bot::telegram::TelegramClient;
use blahrg_bot::{dispatcher, BotContext};
use blahrg_common::config::{resolve_config_path, TomlConfig};
use blahrg_common::db::init_database;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "blahrg-bot", version, about = "Telegram voice clip bot")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "BLAHRG_CONF")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration comes first: it carries the log level
    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Could not load configuration from {}", config_path.display()))?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid logging.level in configuration")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting blahrg-bot v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Configuration: {}", config_path.display());

    let pool = match init_database(&config.db.path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open clip store {}: {}", config.db.path.display(), e);
            return Err(e.into());
        }
    };

    let ctx = Arc::new(BotContext::new(pool, config));
    ctx.media
        .ensure_exists()
        .await
        .context("Failed to initialize media directory")?;

    let clip_count = ctx.registry.store().count().await?;
    info!(
        clips = clip_count,
        media = %ctx.media.root().display(),
        "Clip store ready"
    );

    let client = Arc::new(TelegramClient::new(&ctx.config.telegram)?);
    let me = client
        .get_me()
        .await
        .context("Bot token check failed (getMe)")?;
    info!(
        "✓ Connected to Telegram as @{}",
        me.username.as_deref().unwrap_or(&me.first_name)
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                shutdown.cancel();
            }
        });
    }

    dispatcher::run(ctx, client, shutdown).await?;

    Ok(())
}
