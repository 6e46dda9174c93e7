//! General commands - ping, help, and uptime.
//!
//! Simple commands available to everyone (subject to the blacklist gate);
//! none of them touch external services.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{bot::Context, errors::Result};

    /// Checks that the bot is responsive and reports gateway latency.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: Context<'_>) -> Result<()> {
        let latency = ctx.ping().await;
        if latency.is_zero() {
            // The shard has not completed a heartbeat round-trip yet.
            ctx.say("🏓 Pong!").await?;
        } else {
            ctx.say(format!("🏓 Pong! Gateway latency: {}ms", latency.as_millis()))
                .await?;
        }
        Ok(())
    }

    /// Displays help for all commands, or detailed help for one command.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(
        ctx: Context<'_>,
        #[description = "Command to show detailed help for"] command: Option<String>,
    ) -> Result<()> {
        poise::builtins::help(
            ctx,
            command.as_deref(),
            poise::builtins::HelpConfiguration {
                extra_text_at_bottom:
                    "JamUtilities - commands work as slash commands and with the text prefix.",
                ..Default::default()
            },
        )
        .await?;
        Ok(())
    }

    /// Reports how long the bot process has been running.
    #[poise::command(slash_command, prefix_command)]
    pub async fn uptime(ctx: Context<'_>) -> Result<()> {
        let uptime = ctx.data().started_at.elapsed();
        ctx.say(format!("⏱️ Uptime: {}", format_duration(uptime.as_secs())))
            .await?;
        Ok(())
    }

    pub(super) fn format_duration(total_secs: u64) -> String {
        let days = total_secs / 86_400;
        let hours = (total_secs % 86_400) / 3_600;
        let minutes = (total_secs % 3_600) / 60;
        let seconds = total_secs % 60;

        if days > 0 {
            format!("{days}d {hours}h {minutes}m {seconds}s")
        } else if hours > 0 {
            format!("{hours}h {minutes}m {seconds}s")
        } else if minutes > 0 {
            format!("{minutes}m {seconds}s")
        } else {
            format!("{seconds}s")
        }
    }
}

// Re-export all commands
pub use inner::*;

#[cfg(test)]
mod tests {
    use super::inner::format_duration;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(5), "5s");
        assert_eq!(format_duration(65), "1m 5s");
        assert_eq!(format_duration(3_725), "1h 2m 5s");
        assert_eq!(format_duration(90_061), "1d 1h 1m 1s");
    }
}
