//! Singleton control record: last applied version and the run lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::MigrationStore;
use crate::version::Version;

/// Fixed id of the singleton record in the control collection.
pub const CONTROL_RECORD_ID: &str = "control";

/// The sole coordination point between runs: the latest applied
/// version and the advisory run lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlRecord {
    /// Latest applied version; `None` until a migration has run.
    pub last_version: Option<Version>,
    pub locked: bool,
    pub updated_at: DateTime<Utc>,
}

/// Accessor for the control collection.
///
/// The lock is advisory: `get` and the `set_*` writes are separate
/// store operations, so two processes racing between them can both
/// observe `locked = false`. Cross-process atomicity is a storage
/// concern, not handled here.
pub struct Control<S: MigrationStore> {
    store: Arc<S>,
    collection: String,
}

impl<S: MigrationStore> Control<S> {
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Current record, lazily created as `{ None, unlocked }` on first
    /// read.
    pub async fn get(&self) -> Result<ControlRecord> {
        match self.store.get(&self.collection, CONTROL_RECORD_ID).await? {
            Some(record) => Ok(serde_json::from_value(record)?),
            None => {
                let record = ControlRecord {
                    last_version: None,
                    locked: false,
                    updated_at: Utc::now(),
                };
                self.put(&record).await?;
                Ok(record)
            }
        }
    }

    async fn put(&self, record: &ControlRecord) -> Result<()> {
        self.store
            .upsert(
                &self.collection,
                CONTROL_RECORD_ID,
                serde_json::to_value(record)?,
            )
            .await
    }

    /// Update the lock flag; `last_version` is untouched.
    pub async fn set_locked(&self, locked: bool) -> Result<()> {
        let mut record = self.get().await?;
        record.locked = locked;
        record.updated_at = Utc::now();
        self.put(&record).await
    }

    /// Record a newly applied version and clear the lock.
    pub async fn set_applied(&self, version: Version) -> Result<()> {
        let mut record = self.get().await?;
        record.last_version = Some(version);
        record.locked = false;
        record.updated_at = Utc::now();
        self.put(&record).await
    }

    /// Drop the record (explicit reset only); the next `get` recreates
    /// the default.
    pub async fn clear(&self) -> Result<()> {
        self.store.delete_all(&self.collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn control() -> Control<MemoryStore> {
        Control::new(Arc::new(MemoryStore::new()), "migration_status")
    }

    #[tokio::test]
    async fn test_lazily_created_default() {
        let control = control();
        let record = control.get().await.unwrap();
        assert!(record.last_version.is_none());
        assert!(!record.locked);
    }

    #[tokio::test]
    async fn test_set_locked_keeps_last_version() {
        let control = control();
        control
            .set_applied("1.0.0_1".parse().unwrap())
            .await
            .unwrap();
        control.set_locked(true).await.unwrap();

        let record = control.get().await.unwrap();
        assert!(record.locked);
        assert_eq!(record.last_version.unwrap().to_string(), "1.0.0_1");
    }

    #[tokio::test]
    async fn test_set_applied_clears_lock() {
        let control = control();
        control.set_locked(true).await.unwrap();
        control
            .set_applied("2.0.0_1".parse().unwrap())
            .await
            .unwrap();

        let record = control.get().await.unwrap();
        assert!(!record.locked);
        assert_eq!(record.last_version.unwrap().to_string(), "2.0.0_1");
    }

    #[tokio::test]
    async fn test_clear_reverts_to_default() {
        let control = control();
        control
            .set_applied("1.0.0_1".parse().unwrap())
            .await
            .unwrap();
        control.clear().await.unwrap();

        let record = control.get().await.unwrap();
        assert!(record.last_version.is_none());
        assert!(!record.locked);
    }
}
