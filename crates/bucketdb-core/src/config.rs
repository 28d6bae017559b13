//! Repository configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the repository's data lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// A private in-memory database, discarded on close.
    #[default]
    Memory,
    /// A database file, created on first open.
    File(PathBuf),
}

/// Durability level for commits, mapped to SQLite's `synchronous` pragma.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// Sync at every commit (default). Maximum durability.
    #[default]
    Full,
    /// Sync at checkpoints only. Safe against corruption in WAL mode, but a
    /// power loss may drop the latest commits.
    Normal,
    /// Never sync. Useful for bulk loads and tests.
    Off,
}

impl SyncMode {
    pub(crate) fn pragma_value(self) -> &'static str {
        match self {
            SyncMode::Full => "FULL",
            SyncMode::Normal => "NORMAL",
            SyncMode::Off => "OFF",
        }
    }
}

/// Journal mode for file-backed repositories. Ignored in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    pub(crate) fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "wal",
            JournalMode::Delete => "delete",
        }
    }
}

/// Settings applied once when a repository is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub location: Location,
    pub sync_mode: SyncMode,
    pub journal_mode: JournalMode,
    /// How long a write waits for a lock held by another connection.
    pub busy_timeout_ms: u64,
    /// Create missing parent directories of a file location.
    pub create_parent_dirs: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            location: Location::Memory,
            sync_mode: SyncMode::Full,
            journal_mode: JournalMode::Wal,
            busy_timeout_ms: 5_000,
            create_parent_dirs: true,
        }
    }
}

impl RepositoryConfig {
    /// Default settings for an in-memory repository.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Default settings for a repository stored at `path`.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    pub fn with_busy_timeout_ms(mut self, millis: u64) -> Self {
        self.busy_timeout_ms = millis;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RepositoryConfig::default();
        assert_eq!(config.location, Location::Memory);
        assert_eq!(config.sync_mode, SyncMode::Full);
        assert_eq!(config.journal_mode, JournalMode::Wal);
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert!(config.create_parent_dirs);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: RepositoryConfig = serde_json::from_str(
            r#"{"location": {"File": "/tmp/app.db"}, "sync_mode": "Normal"}"#,
        )
        .unwrap();
        assert_eq!(config.location, Location::File(PathBuf::from("/tmp/app.db")));
        assert_eq!(config.sync_mode, SyncMode::Normal);
        assert_eq!(config.journal_mode, JournalMode::Wal);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_builders() {
        let config = RepositoryConfig::file("data/app.db")
            .with_sync_mode(SyncMode::Off)
            .with_journal_mode(JournalMode::Delete)
            .with_busy_timeout_ms(100);
        assert_eq!(config.location, Location::File(PathBuf::from("data/app.db")));
        assert_eq!(config.sync_mode.pragma_value(), "OFF");
        assert_eq!(config.journal_mode.pragma_value(), "delete");
        assert_eq!(config.busy_timeout_ms, 100);
    }
}
