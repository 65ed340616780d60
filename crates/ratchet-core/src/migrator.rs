//! The migration engine: resolves work lists, enforces ordering and
//! consistency policy, and executes migrations under the control lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::control::Control;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::migration::Migration;
use crate::options::{LogLevel, MigratorOptions};
use crate::registry::MigrationRegistry;
use crate::store::MigrationStore;
use crate::version::Version;

/// Environment variable consulted by [`Migrator::migrate_from_env`].
pub const MIGRATE_ENV_VAR: &str = "MIGRATE";

/// Command accepted by [`Migrator::migrate_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateCommand {
    /// Run every registered migration not yet in the ledger.
    Latest,
    /// Force a rerun of one registered version, bypassing the
    /// already-executed filter.
    Version(Version),
}

impl MigrateCommand {
    /// Parse `"latest"` or an explicit version string. Anything else
    /// fails with `InvalidCommand`.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw == "latest" {
            return Ok(Self::Latest);
        }
        match raw.parse::<Version>() {
            Ok(version) => Ok(Self::Version(version)),
            Err(_) => Err(Error::InvalidCommand(raw.to_string())),
        }
    }
}

/// Orchestrates migration runs against a [`MigrationStore`].
///
/// Two states, tracked in the persisted control record: Idle
/// (`locked = false`) and Running (`locked = true`). The transition to
/// Running happens only inside [`Migrator::migrate_to`]; the
/// transition back to Idle happens on every exit path, including
/// action failure.
///
/// Within one process the engine is single-threaded: `migrate_to`
/// runs to completion before returning and migrations execute strictly
/// sequentially. The lock is advisory across processes (read then
/// write, not compare-and-set).
pub struct Migrator<S: MigrationStore> {
    store: Arc<S>,
    registry: Mutex<MigrationRegistry>,
    options: MigratorOptions,
}

impl<S: MigrationStore> Migrator<S> {
    /// Create a migrator with default options.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_options(store, MigratorOptions::default())
    }

    /// Create a migrator with the given options.
    pub fn with_options(store: Arc<S>, options: MigratorOptions) -> Self {
        Self {
            store,
            registry: Mutex::new(MigrationRegistry::new()),
            options,
        }
    }

    /// Replace the options wholesale.
    pub fn configure(&mut self, options: MigratorOptions) {
        self.options = options;
    }

    pub fn options(&self) -> &MigratorOptions {
        &self.options
    }

    /// Register a migration. Ordering across `add` calls does not
    /// matter; the run resolves it.
    pub fn add(&self, migration: Migration) -> Result<()> {
        self.registry().add(migration)
    }

    /// Versions with a ledger entry, in the order they were recorded.
    pub async fn get_executed_versions(&self) -> Result<Vec<Version>> {
        self.ledger().executed_versions().await
    }

    /// Run migrations according to `command`: `"latest"` runs every
    /// registered version absent from the ledger in ascending order;
    /// an explicit version forces a rerun of that single migration.
    ///
    /// A locked control record makes this a logged no-op, which also
    /// covers an action calling back into its own migrator.
    pub async fn migrate_to(&self, command: &str) -> Result<()> {
        if self.control().get().await?.locked {
            self.info("Not migrating, control is locked");
            return Ok(());
        }

        if command.is_empty() {
            return Err(Error::InvalidCommand(command.to_string()));
        }

        if self.registry().is_empty() {
            self.info("Cannot migrate: no migration script found");
            return Ok(());
        }

        self.control().set_locked(true).await?;
        let outcome = self.run_locked(command).await;
        // Running -> Idle on every exit path, errors included.
        let unlock = self.control().set_locked(false).await;
        outcome.and(unlock)
    }

    /// Mark a version as executed without invoking its action, for
    /// adopting a pre-existing store into the tracked baseline.
    pub async fn save_without_running(&self, version: &str) -> Result<()> {
        let version: Version = version.parse()?;
        let migration = self
            .find(&version)
            .ok_or_else(|| Error::NotFound(format!("migration version {version}")))?;

        self.control().set_locked(true).await?;
        let outcome = async {
            self.ledger().record_success(&migration).await?;
            self.control().set_applied(version).await
        }
        .await;
        let unlock = self.control().set_locked(false).await;
        let result = outcome.and(unlock);

        if result.is_ok() {
            self.info(&format!("Saved migration version {version} without running"));
        }
        result
    }

    /// Run `migrate_to` with the value of the `MIGRATE` environment
    /// variable when it is set. Startup glue; same contract as
    /// [`Migrator::migrate_to`].
    pub async fn migrate_from_env(&self) -> Result<()> {
        match std::env::var(MIGRATE_ENV_VAR) {
            Ok(command) if !command.is_empty() => self.migrate_to(&command).await,
            _ => Ok(()),
        }
    }

    /// Clear the registry, the ledger, and the control record
    /// together. Test/development use only.
    pub async fn reset(&self) -> Result<()> {
        self.registry().clear();
        self.ledger().clear().await?;
        self.control().clear().await
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn registry(&self) -> MutexGuard<'_, MigrationRegistry> {
        // The guard is never held across an await point.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find(&self, version: &Version) -> Option<Migration> {
        self.registry().find(version).cloned()
    }

    fn ledger(&self) -> Ledger<S> {
        Ledger::new(self.store.clone(), &self.options.ledger_collection)
    }

    fn control(&self) -> Control<S> {
        Control::new(self.store.clone(), &self.options.control_collection)
    }

    async fn run_locked(&self, command: &str) -> Result<()> {
        let ledger = self.ledger();

        let (work, rerun) = match MigrateCommand::parse(command)? {
            MigrateCommand::Latest => {
                let executed = ledger.executed_versions().await?;
                let pending: Vec<Migration> = self
                    .registry()
                    .all()
                    .into_iter()
                    .filter(|m| !executed.contains(&m.version()))
                    .collect();

                // A pending version older than the last applied one
                // means a migration was added out of sequence.
                let control = self.control().get().await?;
                if let Some(last) = control.last_version {
                    let stale: Vec<Version> = pending
                        .iter()
                        .map(Migration::version)
                        .filter(|v| *v < last)
                        .collect();
                    if !stale.is_empty() && self.options.stop_if_old_version_script_added {
                        self.info(&format!(
                            "Cannot migrate: old version script found: {}",
                            join_versions(&stale)
                        ));
                        return Ok(());
                    }
                }

                // An executed migration whose definition is gone or
                // whose fingerprint changed was altered after the fact.
                let changed = self.changed_executed_versions(&ledger).await?;
                if !changed.is_empty() && self.options.stop_if_old_version_script_updated {
                    self.info(&format!(
                        "Cannot migrate: old version script updated: {}",
                        join_versions(&changed)
                    ));
                    return Ok(());
                }

                (pending, false)
            }
            MigrateCommand::Version(version) => {
                let migration = self
                    .find(&version)
                    .ok_or_else(|| Error::NotFound(format!("migration version {version}")))?;
                (vec![migration], true)
            }
        };

        if work.is_empty() {
            if self.options.log_if_already_latest {
                self.info("Not migrating, already at latest, no new script found");
            }
            return Ok(());
        }

        for migration in &work {
            self.info(&format!(
                "Running version: {} ({})",
                migration.version(),
                migration.name()
            ));
            if let Err(cause) = migration.run().await {
                return Err(Error::MigrationExecutionFailed {
                    version: migration.version(),
                    source: cause,
                });
            }
            ledger.record_success(migration).await?;
        }

        if !rerun {
            // Preserves the source behavior: the pointer tracks the
            // last item of the sorted work list even when policy
            // checks were disabled and an old version just ran.
            if let Some(last) = work.last() {
                self.control().set_applied(last.version()).await?;
            }
        }

        self.info("Finished migrating");
        Ok(())
    }

    async fn changed_executed_versions(&self, ledger: &Ledger<S>) -> Result<Vec<Version>> {
        let mut changed = Vec::new();
        for entry in ledger.entries().await? {
            match self.find(&entry.version) {
                None => changed.push(entry.version),
                Some(m) if m.fingerprint() != entry.fingerprint => changed.push(entry.version),
                Some(_) => {}
            }
        }
        Ok(changed)
    }

    fn log(&self, level: LogLevel, message: &str) {
        if !self.options.log_enabled {
            return;
        }
        if let Some(logger) = &self.options.logger {
            logger(level, message);
            return;
        }
        match level {
            LogLevel::Debug => debug!(target: "ratchet", "{message}"),
            LogLevel::Info => info!(target: "ratchet", "{message}"),
            LogLevel::Warn => warn!(target: "ratchet", "{message}"),
            LogLevel::Error => error!(target: "ratchet", "{message}"),
        }
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }
}

fn join_versions(versions: &[Version]) -> String {
    versions
        .iter()
        .map(Version::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
