//! Bot layer - Discord-specific wiring for JamUtilities.
//!
//! This module owns the poise framework setup, the dispatch gate that runs
//! before every command, shard lifecycle logging, and the built-in command
//! set.

/// Built-in command implementations (general, owner)
pub mod commands;
/// Framework construction, error handling, and the client run loop
pub mod framework;
/// Pre-dispatch gate: blacklist and disabled-command checks
pub mod gate;
/// Shard lifecycle logging and shard-count configuration
pub mod shards;

use crate::{
    config::AppConfig,
    core::{blacklist::BlacklistStore, registry::DisabledCommands},
};
use std::{sync::Arc, time::Instant};

pub use framework::run;

/// Shared data available to all command invocations.
///
/// Everything in here is either immutable after startup or internally
/// synchronized; nothing is a process-global.
pub struct Data {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The blacklist store, consulted by the gate and mutated by owner
    /// commands.
    pub blacklist: Arc<BlacklistStore>,
    /// Runtime disabled-command state.
    pub disabled: DisabledCommands,
    /// Names of all registered commands, for toggle validation.
    pub command_names: Vec<String>,
    /// Process start, for the `uptime` command.
    pub started_at: Instant,
}

/// Error type commands return; poise routes it to the error handler.
pub type Error = crate::errors::Error;
/// Invocation context shared by slash and prefix commands.
pub type Context<'a> = poise::Context<'a, Data, Error>;
