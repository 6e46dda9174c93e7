use dotenvy::dotenv;
use jamutilities::{
    bot,
    config::AppConfig,
    core::blacklist::{self, BlacklistStore},
    errors::Result,
};
use std::{env, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = Arc::new(
        AppConfig::from_env()
            .inspect_err(|e| error!("Critical error loading configuration: {e}"))?,
    );
    info!("Successfully processed application configuration.");

    // 4. Load the blacklist and start its file watcher
    let blacklist = Arc::new(
        BlacklistStore::load(&app_config.blacklist_path)
            .inspect_err(|e| error!("Failed to load blacklist: {e}"))?,
    );
    let watcher = blacklist.spawn_watcher(blacklist::WATCH_INTERVAL);

    // 5. Run the bot
    // DISCORD_TOKEN is read here, directly before use, not stored in AppConfig
    let token = env::var("DISCORD_TOKEN")
        .inspect_err(|e| error!("DISCORD_TOKEN not found: {e}"))?;

    bot::run(token, app_config, blacklist, watcher)
        .await
        .inspect_err(|e| error!("Bot exited with error: {e}"))?;

    Ok(())
}
