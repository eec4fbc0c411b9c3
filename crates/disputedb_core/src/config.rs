//! Engine configuration.

use std::time::Duration;

/// Configuration for opening an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether to create the store file if it does not exist.
    pub create_if_missing: bool,

    /// Whether to fsync the WAL on every commit (safer, slower).
    ///
    /// With this off, a commit is pushed to the OS but a power loss may
    /// drop the last transactions. Process crashes are always safe.
    pub sync_on_commit: bool,

    /// How long to wait for the exclusive file lock before giving up
    /// with a lock-timeout error.
    pub lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            lock_timeout: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store file if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to fsync the WAL on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the file-lock acquisition timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_commit);
        assert_eq!(config.lock_timeout, Duration::from_secs(1));
    }

    #[test]
    fn builder() {
        let config = EngineConfig::new()
            .create_if_missing(false)
            .sync_on_commit(false)
            .lock_timeout(Duration::from_millis(50));
        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert_eq!(config.lock_timeout, Duration::from_millis(50));
    }
}
