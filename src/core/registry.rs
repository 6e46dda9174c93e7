//! Command registry - explicit, compile-time-visible command registration.
//!
//! The set of commands is a static list of constructors handed to
//! [`CommandRegistry::from_commands`]; there is no runtime discovery. The
//! registry deduplicates by name (last definition wins) before the list is
//! given to the framework, and [`DisabledCommands`] carries the runtime
//! enable/disable state that the dispatch gate checks before every
//! invocation.

use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};
use tracing::warn;

/// Deduplicated command list, built once at startup.
pub struct CommandRegistry<D, E> {
    commands: Vec<poise::Command<D, E>>,
}

impl<D, E> CommandRegistry<D, E> {
    /// Builds the registry from an explicit command list.
    ///
    /// Command names must be unique; when two definitions share a name, the
    /// later one replaces the earlier (last-loaded wins) and the collision is
    /// logged.
    #[must_use]
    pub fn from_commands(commands: Vec<poise::Command<D, E>>) -> Self {
        let mut deduped: Vec<poise::Command<D, E>> = Vec::with_capacity(commands.len());

        for command in commands {
            if let Some(existing) = deduped.iter_mut().find(|c| c.name == command.name) {
                warn!(
                    command = %command.name,
                    "Duplicate command definition, keeping the later one"
                );
                *existing = command;
            } else {
                deduped.push(command);
            }
        }

        Self { commands: deduped }
    }

    /// Names of all registered commands.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.name.clone()).collect()
    }

    /// Whether a command with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c.name == name)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Consumes the registry, yielding the command list for the framework
    /// builder.
    #[must_use]
    pub fn into_commands(self) -> Vec<poise::Command<D, E>> {
        self.commands
    }
}

/// Runtime enable/disable state for commands, shared between the toggle
/// command and the dispatch gate.
///
/// Toggling alone changes nothing about dispatch; enforcement lives in the
/// gate, which consults [`DisabledCommands::is_disabled`] before invoking a
/// command.
#[derive(Debug, Clone, Default)]
pub struct DisabledCommands {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl DisabledCommands {
    /// Creates the set seeded with the names disabled via configuration.
    #[must_use]
    pub fn new(initial: impl IntoIterator<Item = String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.into_iter().collect())),
        }
    }

    /// Whether dispatch to this command is currently disabled.
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        match self.inner.read() {
            Ok(guard) => guard.contains(name),
            Err(poisoned) => poisoned.into_inner().contains(name),
        }
    }

    /// Marks a command disabled or enabled. Returns whether the state
    /// actually changed.
    pub fn set_disabled(&self, name: &str, disabled: bool) -> bool {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if disabled {
            guard.insert(name.to_string())
        } else {
            guard.remove(name)
        }
    }

    /// Sorted list of currently disabled command names.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.inner.read() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        };
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;

    fn named_command(name: &str, description: &str) -> poise::Command<(), Error> {
        poise::Command {
            name: name.to_string(),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_registry_keeps_unique_names() {
        let registry = CommandRegistry::from_commands(vec![
            named_command("ping", "first"),
            named_command("help", "second"),
        ]);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("ping"));
        assert!(registry.contains("help"));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_duplicate_name_last_loaded_wins() {
        let registry = CommandRegistry::from_commands(vec![
            named_command("ping", "old"),
            named_command("help", "help"),
            named_command("ping", "new"),
        ]);

        assert_eq!(registry.len(), 2);
        let commands = registry.into_commands();
        let ping = commands.iter().find(|c| c.name == "ping").unwrap();
        assert_eq!(ping.description.as_deref(), Some("new"));
    }

    #[test]
    fn test_disabled_commands_toggle() {
        let disabled = DisabledCommands::new(["weather".to_string()]);

        assert!(disabled.is_disabled("weather"));
        assert!(!disabled.is_disabled("ping"));

        assert!(disabled.set_disabled("ping", true));
        assert!(disabled.is_disabled("ping"));

        // Toggling to the current state is a no-op.
        assert!(!disabled.set_disabled("ping", true));

        assert!(disabled.set_disabled("ping", false));
        assert!(!disabled.is_disabled("ping"));

        assert_eq!(disabled.snapshot(), vec!["weather".to_string()]);
    }

    #[test]
    fn test_disabled_commands_shared_between_clones() {
        let disabled = DisabledCommands::default();
        let clone = disabled.clone();

        clone.set_disabled("ping", true);
        assert!(disabled.is_disabled("ping"));
    }
}
