//! Migrator configuration options.

use std::fmt;
use std::sync::Arc;

/// Severity passed to a custom logger callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Caller-supplied log sink. When unset, the migrator logs through
/// `tracing`.
pub type LogCallback = Arc<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Default name of the collection holding the control record.
pub const DEFAULT_CONTROL_COLLECTION: &str = "migration_status";

/// Default name of the collection holding the executed-version ledger.
pub const DEFAULT_LEDGER_COLLECTION: &str = "migration_list";

/// Options governing logging, consistency policy, and collection
/// naming.
#[derive(Clone)]
pub struct MigratorOptions {
    /// false disables all migrator logging.
    pub log_enabled: bool,
    /// Custom log sink; `None` routes to `tracing`.
    pub logger: Option<LogCallback>,
    /// Log the "already at latest" branch when a run finds nothing to do.
    pub log_if_already_latest: bool,
    /// Abort a "latest" run when a pending version sorts before the
    /// last applied one.
    pub stop_if_old_version_script_added: bool,
    /// Abort a "latest" run when an executed migration's logic was
    /// changed or removed after the fact.
    pub stop_if_old_version_script_updated: bool,
    /// Collection holding the control record.
    pub control_collection: String,
    /// Collection holding the executed-version ledger.
    pub ledger_collection: String,
}

impl Default for MigratorOptions {
    fn default() -> Self {
        Self {
            log_enabled: true,
            logger: None,
            log_if_already_latest: true,
            stop_if_old_version_script_added: true,
            stop_if_old_version_script_updated: true,
            control_collection: DEFAULT_CONTROL_COLLECTION.to_string(),
            ledger_collection: DEFAULT_LEDGER_COLLECTION.to_string(),
        }
    }
}

impl MigratorOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_enabled(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    pub fn logger(mut self, logger: LogCallback) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn log_if_already_latest(mut self, enabled: bool) -> Self {
        self.log_if_already_latest = enabled;
        self
    }

    pub fn stop_if_old_version_script_added(mut self, enabled: bool) -> Self {
        self.stop_if_old_version_script_added = enabled;
        self
    }

    pub fn stop_if_old_version_script_updated(mut self, enabled: bool) -> Self {
        self.stop_if_old_version_script_updated = enabled;
        self
    }

    pub fn control_collection(mut self, name: impl Into<String>) -> Self {
        self.control_collection = name.into();
        self
    }

    pub fn ledger_collection(mut self, name: impl Into<String>) -> Self {
        self.ledger_collection = name.into();
        self
    }
}

impl fmt::Debug for MigratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorOptions")
            .field("log_enabled", &self.log_enabled)
            .field("logger", &self.logger.as_ref().map(|_| "<callback>"))
            .field("log_if_already_latest", &self.log_if_already_latest)
            .field(
                "stop_if_old_version_script_added",
                &self.stop_if_old_version_script_added,
            )
            .field(
                "stop_if_old_version_script_updated",
                &self.stop_if_old_version_script_updated,
            )
            .field("control_collection", &self.control_collection)
            .field("ledger_collection", &self.ledger_collection)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MigratorOptions::default();
        assert!(options.log_enabled);
        assert!(options.logger.is_none());
        assert!(options.log_if_already_latest);
        assert!(options.stop_if_old_version_script_added);
        assert!(options.stop_if_old_version_script_updated);
        assert_eq!(options.control_collection, "migration_status");
        assert_eq!(options.ledger_collection, "migration_list");
    }

    #[test]
    fn test_builder_chaining() {
        let options = MigratorOptions::new()
            .log_enabled(false)
            .stop_if_old_version_script_added(false)
            .control_collection("app_migration_control")
            .ledger_collection("app_migration_ledger");

        assert!(!options.log_enabled);
        assert!(!options.stop_if_old_version_script_added);
        assert!(options.stop_if_old_version_script_updated);
        assert_eq!(options.control_collection, "app_migration_control");
        assert_eq!(options.ledger_collection, "app_migration_ledger");
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
