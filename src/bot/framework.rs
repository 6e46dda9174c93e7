//! Framework construction and the client run loop.
//!
//! Builds the poise framework from the static command list, registers slash
//! command metadata with Discord in one bulk call during setup (fatal on
//! failure), and runs the sharded client until shutdown.

use crate::{
    bot::{commands, gate, shards, Data},
    config::AppConfig,
    core::{
        blacklist::{BlacklistStore, WatcherHandle},
        registry::{CommandRegistry, DisabledCommands},
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::{sync::Arc, time::Instant};
use tracing::{error, info};

/// The static command registration list. Adding a command means adding a line
/// here; there is no runtime discovery.
#[must_use]
pub fn built_in_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        commands::ping(),
        commands::help(),
        commands::uptime(),
        commands::blacklist(),
        commands::togglecommand(),
        commands::shards(),
    ]
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            // A bot that failed to register its commands is non-functional;
            // abort startup.
            panic!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            let embed = serenity::CreateEmbed::default()
                .title("❌ Command Error")
                .description(error.to_string())
                .color(gate::DENIAL_COLOR);
            if let Err(e) = ctx.send(poise::CreateReply::default().embed(embed)).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Runs the bot until the client stops or a shutdown signal arrives.
///
/// Registration failure during setup and client construction errors are
/// returned to `main`, which exits non-zero.
pub async fn run(
    token: String,
    config: Arc<AppConfig>,
    blacklist: Arc<BlacklistStore>,
    watcher: WatcherHandle,
) -> Result<()> {
    let registry = CommandRegistry::from_commands(built_in_commands());
    let command_names = registry.names();
    info!(commands = command_names.len(), "Built command registry");

    let disabled = DisabledCommands::new(config.disabled_commands.iter().cloned());
    let owners = config.owner_ids().into_iter().collect();
    let prefix = config.prefix.clone();

    let setup_config = Arc::clone(&config);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: registry.into_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            owners,
            command_check: Some(|ctx| Box::pin(gate::command_check(ctx))),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, _framework, _data| {
                Box::pin(shards::handle_gateway_event(ctx, event))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(Data {
                    config: setup_config,
                    blacklist,
                    disabled,
                    command_names,
                    started_at: Instant::now(),
                })
            })
        })
        .build();

    // MESSAGE_CONTENT is required for prefix commands, GUILDS for the cached
    // guild count reported by the shards command.
    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await?;

    spawn_shutdown_handler(Arc::clone(&client.shard_manager), watcher);

    let result = match shards::shard_count_from_env() {
        Some(count) => {
            info!(shards = count, "Starting bot client");
            client.start_shards(count).await
        }
        None => {
            info!("Starting bot client with gateway-recommended shard count");
            client.start_autosharded().await
        }
    };

    if let Err(why) = result {
        error!("Client error: {why:?}");
        return Err(why.into());
    }
    Ok(())
}

/// SIGINT/SIGTERM close the blacklist watcher and shut down all shards, which
/// lets the client run loop return cleanly.
fn spawn_shutdown_handler(shard_manager: Arc<serenity::ShardManager>, watcher: WatcherHandle) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received, stopping shards");
        watcher.close();
        shard_manager.shutdown_all().await;
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {e}");
            // Fall back to Ctrl-C only.
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {e}");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl-C: {e}");
            }
        }
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::CommandRegistry;

    #[test]
    fn test_built_in_commands_have_unique_names() {
        let commands = built_in_commands();
        let count = commands.len();
        let registry = CommandRegistry::from_commands(commands);
        assert_eq!(registry.len(), count);
    }

    #[test]
    fn test_built_in_commands_cover_core_surface() {
        let registry = CommandRegistry::from_commands(built_in_commands());
        for name in ["ping", "help", "uptime", "blacklist", "togglecommand", "shards"] {
            assert!(registry.contains(name), "missing command: {name}");
        }
    }
}
