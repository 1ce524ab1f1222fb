//! Persistent collection on redb
//!
//! Each record type gets three tables: the primary table (id → JSON), a
//! `(timestamp, id)` index that drives ordering and pruning, and a
//! `(partition, timestamp, id)` index for filtered reads. All three are
//! updated in the same write transaction.

use super::collection::{BackendKind, RecordCollection};
use super::error::StoreResult;
use super::records::StoredRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

type Primary = TableDefinition<'static, &'static str, &'static [u8]>;
type ByTime = TableDefinition<'static, (i64, &'static str), ()>;
type ByPartition = TableDefinition<'static, (&'static str, i64, &'static str), ()>;

fn sort_key(ts: DateTime<Utc>) -> i64 {
    // Out of range only past year 2262
    ts.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

pub struct RedbCollection<R> {
    db: Arc<Database>,
    _record: PhantomData<fn() -> R>,
}

impl<R: StoredRecord> RedbCollection<R> {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }

    fn primary() -> Primary {
        TableDefinition::new(R::TABLE)
    }

    fn by_time() -> ByTime {
        TableDefinition::new(R::TIMESTAMP_INDEX)
    }

    fn by_partition() -> ByPartition {
        TableDefinition::new(R::PARTITION_INDEX)
    }

    fn remove_index_entries(txn: &WriteTransaction, record: &R) -> StoreResult<()> {
        let ts = sort_key(record.timestamp());
        {
            let mut by_time = txn.open_table(Self::by_time())?;
            by_time.remove((ts, record.id()))?;
        }
        {
            let mut by_partition = txn.open_table(Self::by_partition())?;
            by_partition.remove((record.partition_key(), ts, record.id()))?;
        }
        Ok(())
    }

    fn stored(&self, id: &str) -> StoreResult<Option<R>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(Self::primary()) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = match table.get(id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(record)
    }

    fn put_sync(&self, record: &R) -> StoreResult<()> {
        let value = serde_json::to_vec(record)?;
        let previous = self.stored(record.id())?;

        let txn = self.db.begin_write()?;
        if let Some(previous) = &previous {
            Self::remove_index_entries(&txn, previous)?;
        }
        {
            let ts = sort_key(record.timestamp());
            let mut primary = txn.open_table(Self::primary())?;
            primary.insert(record.id(), value.as_slice())?;
            let mut by_time = txn.open_table(Self::by_time())?;
            by_time.insert((ts, record.id()), ())?;
            let mut by_partition = txn.open_table(Self::by_partition())?;
            by_partition.insert((record.partition_key(), ts, record.id()), ())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Records in `(timestamp, id)` order, optionally restricted to one
    /// partition
    fn ordered(&self, partition: Option<&str>) -> StoreResult<Vec<R>> {
        let txn = self.db.begin_read()?;
        let primary = match txn.open_table(Self::primary()) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        match partition {
            None => {
                let by_time = txn.open_table(Self::by_time())?;
                for entry in by_time.iter()? {
                    let (key, _) = entry?;
                    let (_, id) = key.value();
                    ids.push(id.to_string());
                }
            }
            Some(part) => {
                let by_partition = txn.open_table(Self::by_partition())?;
                for entry in by_partition.range((part, i64::MIN, "")..(part, i64::MAX, ""))? {
                    let (key, _) = entry?;
                    let (_, _, id) = key.value();
                    ids.push(id.to_string());
                }
            }
        }

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(value) = primary.get(id.as_str())? else {
                continue;
            };
            match serde_json::from_slice(value.value()) {
                Ok(record) => records.push(record),
                // One unreadable row must not hide the rest of the table
                Err(e) => warn!(
                    "Skipping undecodable record '{}' in '{}': {}",
                    id,
                    R::TABLE,
                    e
                ),
            }
        }
        Ok(records)
    }

    fn delete_sync(&self, id: &str) -> StoreResult<bool> {
        let Some(previous) = self.stored(id)? else {
            return Ok(false);
        };
        let txn = self.db.begin_write()?;
        {
            let mut primary = txn.open_table(Self::primary())?;
            primary.remove(id)?;
        }
        Self::remove_index_entries(&txn, &previous)?;
        txn.commit()?;
        Ok(true)
    }

    fn prune_sync(&self, n: usize) -> StoreResult<usize> {
        if n == 0 {
            return Ok(0);
        }
        let txn = self.db.begin_write()?;
        let mut removed = 0;
        {
            let mut primary = txn.open_table(Self::primary())?;
            let mut by_time = txn.open_table(Self::by_time())?;
            let mut by_partition = txn.open_table(Self::by_partition())?;

            let mut victims: Vec<(i64, String)> = Vec::with_capacity(n);
            for entry in by_time.iter()?.take(n) {
                let (key, _) = entry?;
                let (ts, id) = key.value();
                victims.push((ts, id.to_string()));
            }

            for (ts, id) in &victims {
                let partition = match primary.remove(id.as_str())? {
                    Some(value) => {
                        let record: R = serde_json::from_slice(value.value())?;
                        Some(record.partition_key().to_string())
                    }
                    None => None,
                };
                by_time.remove((*ts, id.as_str()))?;
                if let Some(partition) = partition {
                    by_partition.remove((partition.as_str(), *ts, id.as_str()))?;
                    removed += 1;
                }
            }
        }
        txn.commit()?;
        Ok(removed)
    }

    fn clear_sync(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(Self::primary())?;
        txn.delete_table(Self::by_time())?;
        txn.delete_table(Self::by_partition())?;
        txn.commit()?;
        Ok(())
    }

    fn count_sync(&self) -> StoreResult<usize> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(Self::primary()) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        Ok(table.len()? as usize)
    }
}

#[async_trait]
impl<R: StoredRecord> RecordCollection<R> for RedbCollection<R> {
    fn backend(&self) -> BackendKind {
        BackendKind::Persistent
    }

    async fn put(&self, record: &R) -> StoreResult<()> {
        self.put_sync(record)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        self.stored(id)
    }

    async fn all(&self) -> StoreResult<Vec<R>> {
        self.ordered(None)
    }

    async fn by_partition(&self, key: &str) -> StoreResult<Vec<R>> {
        self.ordered(Some(key))
    }

    async fn count(&self) -> StoreResult<usize> {
        self.count_sync()
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.delete_sync(id)
    }

    async fn clear(&self) -> StoreResult<()> {
        self.clear_sync()
    }

    async fn prune_oldest(&self, n: usize) -> StoreResult<usize> {
        self.prune_sync(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::collection::tests::{exercise_collection, interaction_at};
    use crate::store::records::{AntiPatternInteraction, UsageEvent, UsageEventType};
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> Arc<Database> {
        Arc::new(Database::create(dir.path().join("learning.redb")).unwrap())
    }

    #[tokio::test]
    async fn test_redb_collection_contract() {
        let dir = TempDir::new().unwrap();
        let coll = RedbCollection::<AntiPatternInteraction>::new(open(&dir));
        exercise_collection(&coll).await;
    }

    #[tokio::test]
    async fn test_reads_on_fresh_database_are_empty() {
        let dir = TempDir::new().unwrap();
        let coll = RedbCollection::<AntiPatternInteraction>::new(open(&dir));
        assert_eq!(coll.count().await.unwrap(), 0);
        assert!(coll.all().await.unwrap().is_empty());
        assert!(coll.get("nope").await.unwrap().is_none());
        assert_eq!(coll.prune_oldest(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let coll = RedbCollection::<AntiPatternInteraction>::new(open(&dir));
            coll.put(&interaction_at("a", "NET-001", 1)).await.unwrap();
            coll.put(&interaction_at("b", "NET-001", 2)).await.unwrap();
        }
        let coll = RedbCollection::<AntiPatternInteraction>::new(open(&dir));
        assert_eq!(coll.count().await.unwrap(), 2);
        assert_eq!(
            coll.get("b").await.unwrap().unwrap().anti_pattern_id,
            "NET-001"
        );
    }

    #[tokio::test]
    async fn test_undecodable_row_does_not_hide_the_rest() {
        let dir = TempDir::new().unwrap();
        let coll = RedbCollection::<UsageEvent>::new(open(&dir));
        coll.put(&UsageEvent::new(UsageEventType::Audit, true, "s"))
            .await
            .unwrap();
        // serde_json writes NaN as null, which no longer reads back as f64
        let broken = UsageEvent {
            confidence: f64::NAN,
            ..UsageEvent::new(UsageEventType::Generate, true, "s")
        };
        coll.put(&broken).await.unwrap();

        assert_eq!(coll.count().await.unwrap(), 2);
        let all = coll.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].event_type, UsageEventType::Audit);
        assert_eq!(coll.by_partition("s").await.unwrap().len(), 1);
    }
}
