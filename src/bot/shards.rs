//! Shard lifecycle handling.
//!
//! Sharding itself belongs to the SDK; the bot only chooses how many shards
//! to start and forwards gateway lifecycle events to the logger. Shard
//! resilience is the SDK's built-in auto-reconnect; no custom retry policy is
//! layered on top.

use crate::errors::Result;
use poise::serenity_prelude as serenity;
use std::env;
use tracing::{info, warn};

/// Reads `SHARD_COUNT` from the environment. `None` (unset, empty, or zero)
/// means the gateway-recommended shard count is used.
#[must_use]
pub fn shard_count_from_env() -> Option<u32> {
    let raw = env::var("SHARD_COUNT").ok()?;
    parse_shard_count(&raw)
}

fn parse_shard_count(raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(_) => {
            warn!(value = raw, "Ignoring unparseable SHARD_COUNT");
            None
        }
    }
}

/// Forwards gateway lifecycle events to the logger. Wired into the framework
/// event handler; all other events pass through untouched.
pub async fn handle_gateway_event(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
) -> Result<()> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            if let Some(shard) = data_about_bot.shard {
                info!(
                    shard = shard.id.0,
                    total = shard.total,
                    user = %data_about_bot.user.name,
                    "Shard ready"
                );
            } else {
                info!(user = %data_about_bot.user.name, "Gateway ready");
            }
        }
        serenity::FullEvent::ShardStageUpdate { event } => {
            info!(
                shard = event.shard_id.0,
                from = %event.old,
                to = %event.new,
                "Shard connection stage changed"
            );
        }
        serenity::FullEvent::Resume { .. } => {
            info!("Gateway session resumed");
        }
        serenity::FullEvent::ShardsReady { total_shards } => {
            info!(total = total_shards, "All shards ready");
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shard_count() {
        assert_eq!(parse_shard_count("4"), Some(4));
        assert_eq!(parse_shard_count(" 2 "), Some(2));
        assert_eq!(parse_shard_count("0"), None);
        assert_eq!(parse_shard_count("many"), None);
        assert_eq!(parse_shard_count(""), None);
    }
}
