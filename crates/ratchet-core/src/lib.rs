//! # ratchet-core
//!
//! Tracked, ordered, run-at-most-once data migrations.
//!
//! The engine keeps an in-memory registry of migration definitions, a
//! persisted ledger of executed versions (each with a content
//! fingerprint), and a singleton control record carrying the last
//! applied version and an advisory run lock. Storage is pluggable
//! through the [`MigrationStore`] trait; [`MemoryStore`] ships here,
//! durable backends live in `ratchet-db`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratchet_core::{action, MemoryStore, Migration, Migrator};
//!
//! #[tokio::main]
//! async fn main() -> ratchet_core::Result<()> {
//!     let migrator = Migrator::new(Arc::new(MemoryStore::new()));
//!
//!     migrator.add(
//!         Migration::new(
//!             "1.0.0_1".parse()?,
//!             "create users table",
//!             action(|ctx| async move {
//!                 println!("running {} ({})", ctx.version, ctx.name);
//!                 Ok(())
//!             }),
//!         )
//!         .with_source("CREATE TABLE users (id bigserial primary key)"),
//!     )?;
//!
//!     migrator.migrate_to("latest").await
//! }
//! ```

pub mod control;
pub mod error;
pub mod ledger;
pub mod migration;
pub mod migrator;
pub mod options;
pub mod registry;
pub mod store;
pub mod version;

// Re-export commonly used types at crate root
pub use control::{Control, ControlRecord, CONTROL_RECORD_ID};
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerEntry};
pub use migration::{action, fingerprint_of, Migration, MigrationAction, MigrationContext};
pub use migrator::{MigrateCommand, Migrator, MIGRATE_ENV_VAR};
pub use options::{
    LogCallback, LogLevel, MigratorOptions, DEFAULT_CONTROL_COLLECTION, DEFAULT_LEDGER_COLLECTION,
};
pub use registry::MigrationRegistry;
pub use store::{MemoryStore, MigrationStore};
pub use version::Version;
