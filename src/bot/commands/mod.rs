//! Built-in command implementations organized by category.

/// General utility commands (ping, help, uptime)
pub mod general;

/// Owner-only administrative commands (blacklist, togglecommand, shards)
pub mod owner;

// Export commands
pub use general::*;
pub use owner::*;
