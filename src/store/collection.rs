//! Record collections: the storage seam under every adapter

use super::error::StoreResult;
use super::records::StoredRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Persistent,
    Memory,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Persistent => write!(f, "persistent"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Keyed storage for one record type
///
/// `put` replaces any record with the same id. Reads that return several
/// records return them oldest first, ties broken by id.
#[async_trait]
pub trait RecordCollection<R: StoredRecord>: Send + Sync {
    fn backend(&self) -> BackendKind;

    async fn put(&self, record: &R) -> StoreResult<()>;

    async fn get(&self, id: &str) -> StoreResult<Option<R>>;

    async fn all(&self) -> StoreResult<Vec<R>>;

    /// Records whose partition key equals `key`
    async fn by_partition(&self, key: &str) -> StoreResult<Vec<R>>;

    async fn count(&self) -> StoreResult<usize>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn clear(&self) -> StoreResult<()>;

    /// Remove the `n` oldest records, returning how many were removed
    async fn prune_oldest(&self, n: usize) -> StoreResult<usize>;
}

fn sort_oldest_first<R: StoredRecord>(records: &mut [R]) {
    records.sort_by(|a, b| {
        a.timestamp()
            .cmp(&b.timestamp())
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Process-local collection; nothing survives the process
pub struct MemoryCollection<R> {
    records: RwLock<HashMap<String, R>>,
}

impl<R> Default for MemoryCollection<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R> MemoryCollection<R> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<R: StoredRecord> RecordCollection<R> for MemoryCollection<R> {
    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn put(&self, record: &R) -> StoreResult<()> {
        self.records
            .write()
            .await
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn all(&self) -> StoreResult<Vec<R>> {
        let mut records: Vec<R> = self.records.read().await.values().cloned().collect();
        sort_oldest_first(&mut records);
        Ok(records)
    }

    async fn by_partition(&self, key: &str) -> StoreResult<Vec<R>> {
        let mut records: Vec<R> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.partition_key() == key)
            .cloned()
            .collect();
        sort_oldest_first(&mut records);
        Ok(records)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.records.read().await.len())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn prune_oldest(&self, n: usize) -> StoreResult<usize> {
        if n == 0 {
            return Ok(0);
        }
        let mut records = self.records.write().await;
        let mut keys: Vec<_> = records
            .values()
            .map(|r| (r.timestamp(), r.id().to_string()))
            .collect();
        keys.sort();
        let mut removed = 0;
        for (_, id) in keys.into_iter().take(n) {
            if records.remove(&id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::records::{AntiPatternInteraction, InteractionAction};
    use chrono::{Duration, TimeZone, Utc};

    pub(crate) fn interaction_at(id: &str, ap: &str, minutes: i64) -> AntiPatternInteraction {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut record = AntiPatternInteraction::new(ap, InteractionAction::Shown, "s1")
            .with_timestamp(base + Duration::minutes(minutes));
        record.id = id.to_string();
        record
    }

    /// Behaviour every backend must share
    pub(crate) async fn exercise_collection(coll: &dyn RecordCollection<AntiPatternInteraction>) {
        coll.clear().await.unwrap();
        coll.put(&interaction_at("c", "NET-001", 3)).await.unwrap();
        coll.put(&interaction_at("a", "NET-002", 1)).await.unwrap();
        coll.put(&interaction_at("b", "NET-001", 2)).await.unwrap();
        assert_eq!(coll.count().await.unwrap(), 3);

        // Idempotent put, and a re-put with a new timestamp moves the record
        coll.put(&interaction_at("a", "NET-002", 10)).await.unwrap();
        assert_eq!(coll.count().await.unwrap(), 3);
        let ids: Vec<_> = coll.all().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let net001: Vec<_> = coll
            .by_partition("NET-001")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(net001, vec!["b", "c"]);

        assert_eq!(coll.prune_oldest(1).await.unwrap(), 1);
        assert!(coll.get("b").await.unwrap().is_none());
        assert_eq!(coll.by_partition("NET-001").await.unwrap().len(), 1);

        assert!(coll.delete("c").await.unwrap());
        assert!(!coll.delete("c").await.unwrap());
        assert_eq!(coll.count().await.unwrap(), 1);

        coll.clear().await.unwrap();
        assert_eq!(coll.count().await.unwrap(), 0);
        assert!(coll.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_collection_contract() {
        let coll = MemoryCollection::<AntiPatternInteraction>::new();
        exercise_collection(&coll).await;
    }

    #[tokio::test]
    async fn test_prune_more_than_present() {
        let coll = MemoryCollection::<AntiPatternInteraction>::new();
        coll.put(&interaction_at("a", "X", 1)).await.unwrap();
        assert_eq!(coll.prune_oldest(5).await.unwrap(), 1);
        assert_eq!(coll.count().await.unwrap(), 0);
    }
}
