//! Application settings loaded from environment variables.
//!
//! `.env` loading happens in `main` via `dotenvy` before this module runs, so
//! everything here reads the plain process environment. `DISCORD_TOKEN` is
//! deliberately not part of [`AppConfig`]; it is read directly before client
//! construction and never stored.

use crate::errors::{Error, Result};
use poise::serenity_prelude::UserId;
use std::{env, path::PathBuf};

/// Default command prefix when `PREFIX` is unset.
pub const DEFAULT_PREFIX: &str = "!";

/// Default blacklist file location when `BLACKLIST_PATH` is unset.
pub const DEFAULT_BLACKLIST_PATH: &str = "blacklist.env";

/// Typed view of the bot's environment configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Prefix for legacy text-message command invocations.
    pub prefix: String,
    /// The bot owner. Bypasses the blacklist gate and may run owner commands.
    pub owner_id: UserId,
    /// Additional co-owner ids from `TEAM_ID`, treated like the owner.
    pub team_ids: Vec<UserId>,
    /// Command names disabled at startup (seed for the runtime disabled set).
    pub disabled_commands: Vec<String>,
    /// Location of the blacklist file.
    pub blacklist_path: PathBuf,
}

impl AppConfig {
    /// Builds the configuration from environment variables.
    ///
    /// `OWNER_ID` is required; everything else has a default or may be empty.
    pub fn from_env() -> Result<Self> {
        let owner_raw = env::var("OWNER_ID").map_err(|_| Error::Config {
            message: "OWNER_ID is not set".to_string(),
        })?;
        let owner_id = parse_user_id(&owner_raw).ok_or_else(|| Error::Config {
            message: format!("OWNER_ID is not a valid user id: {owner_raw:?}"),
        })?;

        let team_ids = match env::var("TEAM_ID") {
            Ok(raw) => parse_user_id_list(&raw)?,
            Err(_) => Vec::new(),
        };

        let disabled_commands = env::var("DISABLED_COMMANDS")
            .map(|raw| parse_name_list(&raw))
            .unwrap_or_default();

        let prefix = env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string());

        let blacklist_path = env::var("BLACKLIST_PATH")
            .map_or_else(|_| PathBuf::from(DEFAULT_BLACKLIST_PATH), PathBuf::from);

        Ok(Self {
            prefix,
            owner_id,
            team_ids,
            disabled_commands,
            blacklist_path,
        })
    }

    /// Whether this user is the owner or a configured team member.
    #[must_use]
    pub fn is_owner(&self, user_id: UserId) -> bool {
        user_id == self.owner_id || self.team_ids.contains(&user_id)
    }

    /// Owner plus team ids, for the framework's owner set.
    #[must_use]
    pub fn owner_ids(&self) -> Vec<UserId> {
        let mut ids = vec![self.owner_id];
        ids.extend(self.team_ids.iter().copied());
        ids
    }
}

fn parse_user_id(raw: &str) -> Option<UserId> {
    let id: u64 = raw.trim().parse().ok()?;
    (id != 0).then(|| UserId::new(id))
}

/// Parses a comma-separated id list, rejecting the whole value when any item
/// is malformed so a typo does not silently drop a team member.
fn parse_user_id_list(raw: &str) -> Result<Vec<UserId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            parse_user_id(item).ok_or_else(|| Error::Config {
                message: format!("Invalid user id in list: {item:?}"),
            })
        })
        .collect()
}

/// Parses a comma-separated command name list; empty items are dropped.
fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("123456"), Some(UserId::new(123_456)));
        assert_eq!(parse_user_id(" 42 "), Some(UserId::new(42)));
        assert_eq!(parse_user_id("0"), None);
        assert_eq!(parse_user_id("abc"), None);
        assert_eq!(parse_user_id(""), None);
    }

    #[test]
    fn test_parse_user_id_list() {
        let ids = parse_user_id_list("1, 2,3").unwrap();
        assert_eq!(ids, vec![UserId::new(1), UserId::new(2), UserId::new(3)]);

        assert!(parse_user_id_list("").unwrap().is_empty());
        assert!(parse_user_id_list(" , ").unwrap().is_empty());
        assert!(parse_user_id_list("1,notanid").is_err());
    }

    #[test]
    fn test_parse_name_list() {
        assert_eq!(
            parse_name_list("weather, joke ,,qr"),
            vec!["weather", "joke", "qr"]
        );
        assert!(parse_name_list("").is_empty());
    }

    #[test]
    fn test_is_owner() {
        let config = AppConfig {
            prefix: DEFAULT_PREFIX.to_string(),
            owner_id: UserId::new(1),
            team_ids: vec![UserId::new(2)],
            disabled_commands: Vec::new(),
            blacklist_path: PathBuf::from(DEFAULT_BLACKLIST_PATH),
        };

        assert!(config.is_owner(UserId::new(1)));
        assert!(config.is_owner(UserId::new(2)));
        assert!(!config.is_owner(UserId::new(3)));
        assert_eq!(config.owner_ids(), vec![UserId::new(1), UserId::new(2)]);
    }
}
