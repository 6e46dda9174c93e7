/// Flat-file backed blacklist store with atomic snapshot reloads
pub mod blacklist;

/// Static command registration list and runtime disabled-command state
pub mod registry;
