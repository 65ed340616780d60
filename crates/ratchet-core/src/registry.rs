//! In-memory registry of migration definitions.

use crate::error::{Error, Result};
use crate::migration::Migration;
use crate::version::Version;

/// Registry mapping versions to migration definitions.
///
/// Populated by the embedding application before any run. Out-of-order
/// `add` calls are allowed; ordering is resolved at run time by
/// [`MigrationRegistry::all`]. Re-adding an existing version replaces
/// its definition.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: Vec<Migration>,
}

impl MigrationRegistry {
    /// Create a new empty migration registry.
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Register a migration.
    ///
    /// Rejects definitions with a blank name. Nothing about ordering
    /// is rejected here.
    pub fn add(&mut self, migration: Migration) -> Result<()> {
        if migration.name().trim().is_empty() {
            return Err(Error::InvalidMigration(format!(
                "migration {} must supply a non-empty name",
                migration.version()
            )));
        }

        match self
            .migrations
            .iter_mut()
            .find(|m| m.version() == migration.version())
        {
            Some(existing) => *existing = migration,
            None => self.migrations.push(migration),
        }
        Ok(())
    }

    /// Look up the definition for a version.
    pub fn find(&self, version: &Version) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.version() == *version)
    }

    /// All definitions sorted ascending by version.
    ///
    /// Recomputed on every call; definitions may be re-added between
    /// runs, so the sorted view is never cached.
    pub fn all(&self) -> Vec<Migration> {
        let mut sorted: Vec<Migration> = self.migrations.clone();
        sorted.sort_by_key(|m| m.version());
        sorted
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Drop every definition (test/development use).
    pub fn clear(&mut self) {
        self.migrations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::action;

    fn noop(version: &str, name: &str) -> Migration {
        Migration::new(version.parse().unwrap(), name, action(|_| async { Ok(()) }))
    }

    #[test]
    fn test_add_and_find() {
        let mut registry = MigrationRegistry::new();
        registry.add(noop("1.0.0_1", "first")).unwrap();

        let v: Version = "1.0.0_1".parse().unwrap();
        assert_eq!(registry.find(&v).unwrap().name(), "first");
        assert!(registry.find(&"9.9.9_9".parse().unwrap()).is_none());
    }

    #[test]
    fn test_add_rejects_blank_name() {
        let mut registry = MigrationRegistry::new();
        let err = registry.add(noop("1.0.0_1", "   ")).unwrap_err();
        assert!(matches!(err, Error::InvalidMigration(_)));
        assert!(registry.is_empty(), "registry unchanged on rejection");
    }

    #[test]
    fn test_re_add_replaces_definition() {
        let mut registry = MigrationRegistry::new();
        registry.add(noop("1.0.0_1", "original")).unwrap();
        registry.add(noop("1.0.0_1", "updated")).unwrap();

        assert_eq!(registry.len(), 1);
        let v: Version = "1.0.0_1".parse().unwrap();
        assert_eq!(registry.find(&v).unwrap().name(), "updated");
    }

    #[test]
    fn test_all_sorted_ascending_regardless_of_add_order() {
        let mut registry = MigrationRegistry::new();
        registry.add(noop("1.0.0_2", "b")).unwrap();
        registry.add(noop("1.0.0_10", "c")).unwrap();
        registry.add(noop("1.0.0_1", "a")).unwrap();

        let versions: Vec<String> = registry
            .all()
            .iter()
            .map(|m| m.version().to_string())
            .collect();
        assert_eq!(versions, vec!["1.0.0_1", "1.0.0_2", "1.0.0_10"]);
    }
}
