//! PostgreSQL-backed [`MigrationStore`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use ratchet_core::{Error, MigrationStore, Result};

/// Table holding every tracked record, one row per `(collection, id)`.
const RECORDS_TABLE: &str = "ratchet_records";

/// Connection settings for [`PgMigrationStore::connect`].
///
/// A migration run is a single sequential writer, so the pool stays
/// deliberately small; raise `max_connections` only when the same pool
/// is shared with the embedding application.
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool.
    pub acquire_timeout: Duration,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 2,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PgStoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Durable store keeping control and ledger records in a single
/// Postgres table. `scan` order follows the `seq` column, preserving
/// insertion order across restarts.
pub struct PgMigrationStore {
    pool: PgPool,
}

impl PgMigrationStore {
    /// Wrap an existing pool. Call [`PgMigrationStore::ensure_schema`]
    /// before handing the store to a migrator.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with default settings and create the backing table.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with(database_url, PgStoreConfig::default()).await
    }

    /// Connect with explicit settings and create the backing table.
    pub async fn connect_with(database_url: &str, config: PgStoreConfig) -> Result<Self> {
        info!(
            max_connections = config.max_connections,
            acquire_timeout_secs = config.acquire_timeout.as_secs(),
            "Connecting migration store"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(db_err)?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the backing table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        debug!(db_table = RECORDS_TABLE, "Ensuring migration records table exists");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ratchet_records (
                seq BIGSERIAL PRIMARY KEY,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                fields JSONB NOT NULL,
                UNIQUE (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

#[async_trait]
impl MigrationStore for PgMigrationStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT fields FROM ratchet_records WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|r| r.try_get::<Value, _>("fields").map_err(db_err))
            .transpose()
    }

    async fn upsert(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ratchet_records (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET fields = EXCLUDED.fields
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(fields)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Value>> {
        let rows =
            sqlx::query("SELECT fields FROM ratchet_records WHERE collection = $1 ORDER BY seq")
                .bind(collection)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        rows.into_iter()
            .map(|r| r.try_get::<Value, _>("fields").map_err(db_err))
            .collect()
    }

    async fn delete_all(&self, collection: &str) -> Result<()> {
        sqlx::query("DELETE FROM ratchet_records WHERE collection = $1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
