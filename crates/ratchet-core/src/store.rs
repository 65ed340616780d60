//! Storage collaborator trait and the in-memory reference backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};

/// Minimal persistent-store interface the engine runs against.
///
/// Records are JSON objects addressed by `(collection, id)`. Two
/// collections are used: a control collection holding one record under
/// a fixed id, and a ledger collection holding one record per executed
/// version (id = version string).
///
/// Implementations must provide at least read-your-writes consistency
/// for correctness of the lock and ledger checks to hold.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    /// Fetch a record by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Insert or replace a record.
    async fn upsert(&self, collection: &str, id: &str, fields: Value) -> Result<()>;

    /// All records in the collection, in insertion order.
    async fn scan(&self, collection: &str) -> Result<Vec<Value>>;

    /// Remove every record in the collection.
    async fn delete_all(&self, collection: &str) -> Result<()>;
}

/// Process-local store backed by a mutex-guarded map.
///
/// Insertion order is preserved per collection to match `scan`
/// semantics. Suitable for tests and single-process embedders; durable
/// backends live in `ratchet-db`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<(String, Value)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collections<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Vec<(String, Value)>>) -> T,
    ) -> Result<T> {
        let mut guard = self
            .collections
            .lock()
            .map_err(|_| Error::Storage("memory store mutex poisoned".to_string()))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl MigrationStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        self.with_collections(|collections| {
            collections.get(collection).and_then(|records| {
                records
                    .iter()
                    .find(|(record_id, _)| record_id == id)
                    .map(|(_, fields)| fields.clone())
            })
        })
    }

    async fn upsert(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        self.with_collections(|collections| {
            let records = collections.entry(collection.to_string()).or_default();
            match records.iter_mut().find(|(record_id, _)| record_id == id) {
                // Replacement keeps the record's original position.
                Some((_, existing)) => *existing = fields,
                None => records.push((id.to_string(), fields)),
            }
        })
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Value>> {
        self.with_collections(|collections| {
            collections
                .get(collection)
                .map(|records| records.iter().map(|(_, fields)| fields.clone()).collect())
                .unwrap_or_default()
        })
    }

    async fn delete_all(&self, collection: &str) -> Result<()> {
        self.with_collections(|collections| {
            collections.remove(collection);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("ledger", "1.0.0_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let store = MemoryStore::new();
        store
            .upsert("ledger", "1.0.0_1", json!({"name": "first"}))
            .await
            .unwrap();

        let record = store.get("ledger", "1.0.0_1").await.unwrap().unwrap();
        assert_eq!(record["name"], "first");
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place() {
        let store = MemoryStore::new();
        store.upsert("ledger", "a", json!({"n": 1})).await.unwrap();
        store.upsert("ledger", "b", json!({"n": 2})).await.unwrap();
        store.upsert("ledger", "a", json!({"n": 3})).await.unwrap();

        let records = store.scan("ledger").await.unwrap();
        assert_eq!(records.len(), 2);
        // Replaced record keeps its insertion position.
        assert_eq!(records[0]["n"], 3);
        assert_eq!(records[1]["n"], 2);
    }

    #[tokio::test]
    async fn test_scan_preserves_insertion_order() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store.upsert("ledger", id, json!({"id": id})).await.unwrap();
        }

        let ids: Vec<String> = store
            .scan("ledger")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_delete_all_clears_only_named_collection() {
        let store = MemoryStore::new();
        store.upsert("ledger", "a", json!({})).await.unwrap();
        store.upsert("control", "control", json!({})).await.unwrap();

        store.delete_all("ledger").await.unwrap();
        assert!(store.scan("ledger").await.unwrap().is_empty());
        assert_eq!(store.scan("control").await.unwrap().len(), 1);
    }
}
