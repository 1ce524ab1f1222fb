//! Learning stores: feedback records, usage events and anti-pattern
//! interactions
//!
//! The three logical stores share one redb file when persistent. `Stores`
//! is built once at the composition root and handed to whatever needs it.

mod adapters;
mod collection;
mod error;
mod records;
mod redb_collection;

pub use adapters::{
    CalibrationStore, CalibrationStoreAdapter, FeedbackStats, FeedbackStore,
    FeedbackStoreAdapter, InteractionFilter, Tally, UsageStats, UsageStore, UsageStoreAdapter,
};
pub use collection::{BackendKind, MemoryCollection, RecordCollection};
pub use error::{StoreError, StoreResult};
pub use records::{
    AntiPatternInteraction, DiagramSource, FeedbackRecord, InteractionAction, StoredRecord,
    UsageEvent, UsageEventType,
};
pub use redb_collection::RedbCollection;

use crate::config::{RetentionConfig, StoreBackend, StoreConfig};
use redb::Database;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Handle to the three learning stores
#[derive(Clone)]
pub struct Stores {
    pub feedback: Arc<dyn FeedbackStoreAdapter>,
    pub usage: Arc<dyn UsageStoreAdapter>,
    pub calibration: Arc<dyn CalibrationStoreAdapter>,
    backend: BackendKind,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("backend", &self.backend)
            .finish()
    }
}

impl Stores {
    /// Open the stores the configuration asks for
    ///
    /// `auto` tries the redb file and falls back to memory with a single
    /// warning. `persistent` fails instead of falling back.
    pub fn open(config: &StoreConfig, retention: &RetentionConfig) -> StoreResult<Self> {
        match config.backend {
            StoreBackend::Memory => Ok(Self::in_memory(retention)),
            StoreBackend::Persistent => Self::persistent(&config.db_path(), retention),
            StoreBackend::Auto => {
                let path = config.db_path();
                match Self::persistent(&path, retention) {
                    Ok(stores) => Ok(stores),
                    Err(e) => {
                        warn!(
                            "Persistent store at {} unavailable ({}), falling back to in-memory; \
                             feedback will not survive this process",
                            path.display(),
                            e
                        );
                        Ok(Self::in_memory(retention))
                    }
                }
            }
        }
    }

    /// Stores backed by one redb file, created if missing
    pub fn persistent(path: &Path, retention: &RetentionConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::create(path)?);
        info!("Opened learning store at {}", path.display());
        Ok(Self {
            feedback: Arc::new(FeedbackStore::new(
                Box::new(RedbCollection::new(Arc::clone(&db))),
                retention.feedback_cap,
            )),
            usage: Arc::new(UsageStore::new(
                Box::new(RedbCollection::new(Arc::clone(&db))),
                retention.usage_cap,
            )),
            calibration: Arc::new(CalibrationStore::new(
                Box::new(RedbCollection::new(db)),
                retention.interaction_cap,
            )),
            backend: BackendKind::Persistent,
        })
    }

    pub fn in_memory(retention: &RetentionConfig) -> Self {
        Self {
            feedback: Arc::new(FeedbackStore::new(
                Box::new(MemoryCollection::new()),
                retention.feedback_cap,
            )),
            usage: Arc::new(UsageStore::new(
                Box::new(MemoryCollection::new()),
                retention.usage_cap,
            )),
            calibration: Arc::new(CalibrationStore::new(
                Box::new(MemoryCollection::new()),
                retention.interaction_cap,
            )),
            backend: BackendKind::Memory,
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }
}
