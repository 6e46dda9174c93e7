//! Pre-dispatch gate run before every command invocation.
//!
//! Wired into `FrameworkOptions::command_check`: a blacklisted invoker is
//! denied (owners bypass the check), and a command toggled off at runtime is
//! not dispatched. Toggling alone enforces nothing; this gate is where the
//! disabled set takes effect.

use crate::bot::{Context, Data};
use crate::errors::Result;
use poise::serenity_prelude as serenity;
use tracing::info;

/// Red used for denial and error embeds.
pub const DENIAL_COLOR: u32 = 0x00E7_4C3C;

/// Outcome of the gate for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Dispatch proceeds.
    Allow,
    /// Invoker is blacklisted; carries the stored reason when known.
    DenyBlacklisted(Option<String>),
    /// The command, or a group it belongs to, is currently toggled off.
    /// Carries the toggled-off name.
    DenyDisabled(String),
}

/// Pure decision logic, separated from reply plumbing so it can be tested
/// without a gateway connection.
///
/// `command_chain` is the invoked command's full name chain, parents first
/// (e.g. `["blacklist", "add"]`): disabling a group name takes its
/// subcommands down with it.
#[must_use]
pub fn decide(data: &Data, user_id: serenity::UserId, command_chain: &[&str]) -> GateDecision {
    let is_owner = data.config.is_owner(user_id);

    if !is_owner && data.blacklist.is_blacklisted(&user_id.to_string()) {
        let reason = data
            .blacklist
            .info(&user_id.to_string())
            .map(|entry| entry.reason);
        return GateDecision::DenyBlacklisted(reason);
    }

    if let Some(name) = command_chain
        .iter()
        .find(|name| data.disabled.is_disabled(name))
    {
        return GateDecision::DenyDisabled((*name).to_string());
    }

    GateDecision::Allow
}

/// The `command_check` hook. Returning `Ok(false)` stops dispatch without
/// surfacing an error.
pub async fn command_check(ctx: Context<'_>) -> Result<bool> {
    let mut chain: Vec<&str> = ctx
        .parent_commands()
        .iter()
        .map(|command| command.name.as_str())
        .collect();
    chain.push(&ctx.command().name);
    let command_name = ctx.command().qualified_name.clone();

    match decide(ctx.data(), ctx.author().id, &chain) {
        GateDecision::Allow => Ok(true),
        GateDecision::DenyBlacklisted(reason) => {
            info!(
                user = %ctx.author().id,
                command = %command_name,
                "Denied command to blacklisted user"
            );
            let embed = serenity::CreateEmbed::default()
                .title("⛔ Access Denied")
                .description(format!(
                    "You are blacklisted from using this bot.\n**Reason:** {}",
                    reason.as_deref().unwrap_or("No reason recorded")
                ))
                .color(DENIAL_COLOR);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
            Ok(false)
        }
        GateDecision::DenyDisabled(disabled_name) => {
            info!(
                command = %command_name,
                disabled = %disabled_name,
                "Dispatch to disabled command rejected"
            );
            let embed = serenity::CreateEmbed::default()
                .title("🚫 Command Disabled")
                .description(format!(
                    "The command `{disabled_name}` is currently disabled."
                ))
                .color(DENIAL_COLOR);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
            Ok(false)
        }
    }
}
