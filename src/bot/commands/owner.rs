//! Owner-only administrative commands - blacklist management, runtime command
//! toggling, and shard status.
//!
//! All commands here carry `owners_only`; the framework's owner set is seeded
//! from `OWNER_ID` and `TEAM_ID`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::Context,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write as _;
    use std::sync::Arc;

    const INFO_COLOR: u32 = 0x0034_98DB;
    const OK_COLOR: u32 = 0x002E_CC71;

    /// Manages the user blacklist.
    #[poise::command(
        slash_command,
        prefix_command,
        owners_only,
        subcommands("add", "remove", "reason", "search", "info", "list", "reload")
    )]
    pub async fn blacklist(ctx: Context<'_>) -> Result<()> {
        ctx.say(
            "Use a subcommand: `add`, `remove`, `reason`, `search`, `info`, `list`, `reload`.",
        )
        .await?;
        Ok(())
    }

    /// Blacklists a user, snapshotting their current username.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn add(
        ctx: Context<'_>,
        #[description = "User to blacklist"] user: serenity::User,
        #[description = "Why they are being blacklisted"]
        #[rest]
        reason: String,
    ) -> Result<()> {
        let store = &ctx.data().blacklist;
        store.add_user(&user.id.to_string(), &user.name, &reason)?;

        let embed = serenity::CreateEmbed::default()
            .title("✅ User Blacklisted")
            .description(format!(
                "**{}** (`{}`) has been blacklisted.\n**Reason:** {reason}",
                user.name, user.id
            ))
            .color(OK_COLOR);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Removes a user from the blacklist.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn remove(
        ctx: Context<'_>,
        #[description = "User to remove from the blacklist"] user: serenity::User,
    ) -> Result<()> {
        let removed = ctx.data().blacklist.remove_user(&user.id.to_string())?;

        if removed {
            ctx.say(format!(
                "✅ **{}** (`{}`) removed from the blacklist.",
                user.name, user.id
            ))
            .await?;
        } else {
            ctx.say(format!("❌ **{}** is not on the blacklist.", user.name))
                .await?;
        }
        Ok(())
    }

    /// Changes the stored reason for a blacklisted user.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn reason(
        ctx: Context<'_>,
        #[description = "Blacklisted user"] user: serenity::User,
        #[description = "New reason"]
        #[rest]
        reason: String,
    ) -> Result<()> {
        match ctx.data().blacklist.change_reason(&user.id.to_string(), &reason) {
            Ok(()) => {
                ctx.say(format!(
                    "✅ Updated reason for **{}**: {reason}",
                    user.name
                ))
                .await?;
            }
            Err(Error::BlacklistUserNotFound { .. }) => {
                ctx.say(format!(
                    "❌ **{}** is not on the blacklist; nothing to update.",
                    user.name
                ))
                .await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Searches the blacklist by id, username, or reason substring.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn search(
        ctx: Context<'_>,
        #[description = "Case-insensitive substring to search for"]
        #[rest]
        query: String,
    ) -> Result<()> {
        let matches = ctx.data().blacklist.search(&query);

        if matches.is_empty() {
            ctx.say(format!("🔍 No blacklist entries match `{query}`."))
                .await?;
            return Ok(());
        }

        let mut description = String::new();
        for entry in matches.iter().take(25) {
            writeln!(
                &mut description,
                "**{}** (`{}`) — {}",
                entry.username, entry.user_id, entry.reason
            )?;
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("🔍 Blacklist Search: {query}"))
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "{} match{}",
                matches.len(),
                if matches.len() == 1 { "" } else { "es" }
            )))
            .color(INFO_COLOR);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Shows the stored entry for one user.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn info(
        ctx: Context<'_>,
        #[description = "User to look up"] user: serenity::User,
    ) -> Result<()> {
        let Some(entry) = ctx.data().blacklist.info(&user.id.to_string()) else {
            ctx.say(format!("ℹ️ **{}** is not blacklisted.", user.name))
                .await?;
            return Ok(());
        };

        let embed = serenity::CreateEmbed::default()
            .title("📋 Blacklist Entry")
            .field("User", format!("{} (`{}`)", entry.username, entry.user_id), false)
            .field("Reason", entry.reason.clone(), false)
            .field(
                "Recorded",
                entry.timestamp.format("%Y-%m-%d %H:%M UTC").to_string(),
                false,
            )
            .color(INFO_COLOR);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Lists every blacklist entry.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn list(ctx: Context<'_>) -> Result<()> {
        let entries = ctx.data().blacklist.entries();

        if entries.is_empty() {
            ctx.say("📂 The blacklist is empty.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for entry in entries.iter().take(25) {
            writeln!(
                &mut description,
                "**{}** (`{}`) — {}",
                entry.username, entry.user_id, entry.reason
            )?;
        }
        if entries.len() > 25 {
            writeln!(&mut description, "… and {} more", entries.len() - 25)?;
        }

        let embed = serenity::CreateEmbed::default()
            .title("📂 Blacklist")
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "{} entr{}",
                entries.len(),
                if entries.len() == 1 { "y" } else { "ies" }
            )))
            .color(INFO_COLOR);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Rebuilds the in-memory blacklist from disk.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn reload(ctx: Context<'_>) -> Result<()> {
        let count = ctx.data().blacklist.reload()?;
        ctx.say(format!("🔄 Blacklist reloaded: {count} entries."))
            .await?;
        Ok(())
    }

    /// Enables or disables a command at runtime.
    ///
    /// The toggle only flips state; enforcement happens in the dispatch gate
    /// before every invocation.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn togglecommand(
        ctx: Context<'_>,
        #[description = "Command name"] name: String,
        #[description = "true to enable, false to disable"] enabled: bool,
    ) -> Result<()> {
        let data = ctx.data();

        if !data.command_names.contains(&name) {
            ctx.say(format!("❌ Unknown command: `{name}`.")).await?;
            return Ok(());
        }
        // Keeping the toggle itself reachable avoids locking every command
        // off with no way back.
        if name == "togglecommand" && !enabled {
            ctx.say("❌ `togglecommand` cannot be disabled.").await?;
            return Ok(());
        }

        let changed = data.disabled.set_disabled(&name, !enabled);
        let state = if enabled { "enabled" } else { "disabled" };
        if changed {
            ctx.say(format!("✅ Command `{name}` is now {state}.")).await?;
        } else {
            ctx.say(format!("ℹ️ Command `{name}` was already {state}."))
                .await?;
        }
        Ok(())
    }

    /// Shows per-shard connection stage and latency plus the cached guild
    /// count across all shards.
    #[poise::command(slash_command, prefix_command, owners_only)]
    pub async fn shards(ctx: Context<'_>) -> Result<()> {
        let shard_manager = Arc::clone(ctx.framework().shard_manager);
        let runners = shard_manager.runners.lock().await;

        let mut description = String::new();
        for (shard_id, runner) in runners.iter() {
            let latency = runner
                .latency
                .map_or_else(|| "n/a".to_string(), |d| format!("{}ms", d.as_millis()));
            writeln!(
                &mut description,
                "Shard {}: {} (latency {})",
                shard_id.0, runner.stage, latency
            )?;
        }
        let shard_count = runners.len();
        drop(runners);

        let guild_count = ctx.serenity_context().cache.guilds().len();

        let embed = serenity::CreateEmbed::default()
            .title("🧩 Shard Status")
            .description(description)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "{shard_count} shard{} | {guild_count} guild{}",
                if shard_count == 1 { "" } else { "s" },
                if guild_count == 1 { "" } else { "s" }
            )))
            .color(INFO_COLOR);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
