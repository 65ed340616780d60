//! # ratchet-db
//!
//! PostgreSQL storage backend for the ratchet migration tracker: a
//! durable [`ratchet_core::MigrationStore`] implementation keeping
//! control and ledger records in a single `ratchet_records` table.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratchet_db::{Migrator, PgMigrationStore};
//!
//! #[tokio::main]
//! async fn main() -> ratchet_db::Result<()> {
//!     let store = PgMigrationStore::connect("postgres://localhost/app").await?;
//!
//!     let migrator = Migrator::new(Arc::new(store));
//!     // register migrations, then:
//!     migrator.migrate_to("latest").await
//! }
//! ```

pub mod store;

// Re-export core types
pub use ratchet_core::*;

pub use store::{PgMigrationStore, PgStoreConfig};
