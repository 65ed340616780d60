//! The executed-version ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::migration::Migration;
use crate::store::MigrationStore;
use crate::version::Version;

/// Persisted record of one successfully executed migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub version: Version,
    /// md5 digest of the migration's logic at the time it ran.
    pub fingerprint: String,
    pub name: String,
    pub executed_at: DateTime<Utc>,
}

/// Accessor for the ledger collection: at most one entry per version,
/// inserted or replaced, never deleted except by an explicit reset.
pub struct Ledger<S: MigrationStore> {
    store: Arc<S>,
    collection: String,
}

impl<S: MigrationStore> Ledger<S> {
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// All entries in insertion order.
    pub async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        self.store
            .scan(&self.collection)
            .await?
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(Into::into))
            .collect()
    }

    /// Versions with a ledger entry, in insertion order.
    pub async fn executed_versions(&self) -> Result<Vec<Version>> {
        Ok(self.entries().await?.into_iter().map(|e| e.version).collect())
    }

    /// The stored fingerprint for a version, if it has executed.
    pub async fn fingerprint_of(&self, version: &Version) -> Result<Option<String>> {
        match self.store.get(&self.collection, &version.to_string()).await? {
            Some(record) => {
                let entry: LedgerEntry = serde_json::from_value(record)?;
                Ok(Some(entry.fingerprint))
            }
            None => Ok(None),
        }
    }

    /// Upsert an entry for the definition with a fresh fingerprint and
    /// timestamp. Overwrites any prior entry for the version, which is
    /// what forced reruns rely on.
    pub async fn record_success(&self, migration: &Migration) -> Result<()> {
        let entry = LedgerEntry {
            version: migration.version(),
            fingerprint: migration.fingerprint().to_string(),
            name: migration.name().to_string(),
            executed_at: Utc::now(),
        };
        self.store
            .upsert(
                &self.collection,
                &entry.version.to_string(),
                serde_json::to_value(&entry)?,
            )
            .await
    }

    /// Drop every entry (explicit reset only).
    pub async fn clear(&self) -> Result<()> {
        self.store.delete_all(&self.collection).await
    }
}
