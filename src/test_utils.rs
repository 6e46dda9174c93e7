//! Shared test utilities for `JamUtilities`.
//!
//! Helpers for setting up blacklist stores on temporary files and building
//! bot `Data` without a gateway connection.

#![allow(clippy::unwrap_used)]

use crate::{
    bot::Data,
    config::AppConfig,
    core::{blacklist::BlacklistStore, registry::DisabledCommands},
};
use poise::serenity_prelude::UserId;
use std::{
    path::PathBuf,
    sync::Arc,
    time::Instant,
};
use tempfile::TempDir;

/// Creates an empty store backed by a file inside a fresh temp directory.
/// The directory guard must be kept alive for the duration of the test.
pub fn setup_test_store() -> (TempDir, BlacklistStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = BlacklistStore::load(dir.path().join("blacklist.env")).unwrap();
    (dir, store)
}

/// Creates a store pre-populated with `(user_id, username, reason)` entries.
pub fn store_with_entries(entries: &[(&str, &str, &str)]) -> (TempDir, BlacklistStore) {
    let (dir, store) = setup_test_store();
    for (user_id, username, reason) in entries {
        store.add_user(user_id, username, reason).unwrap();
    }
    (dir, store)
}

/// Builds bot `Data` with sensible test defaults: owner id 1, team id 2, no
/// disabled commands, and an empty blacklist on a temp file.
pub fn test_data() -> (TempDir, Data) {
    let (dir, store) = setup_test_store();
    let config = AppConfig {
        prefix: "!".to_string(),
        owner_id: UserId::new(1),
        team_ids: vec![UserId::new(2)],
        disabled_commands: Vec::new(),
        blacklist_path: PathBuf::from(store.path()),
    };
    let data = Data {
        config: Arc::new(config),
        blacklist: Arc::new(store),
        disabled: DisabledCommands::default(),
        command_names: vec![
            "ping".to_string(),
            "help".to_string(),
            "uptime".to_string(),
            "blacklist".to_string(),
            "togglecommand".to_string(),
            "shards".to_string(),
        ],
        started_at: Instant::now(),
    };
    (dir, data)
}
