//! The three learning stores
//!
//! Each adapter sits on a `RecordCollection` and adds retention plus the
//! error policy of its store. Reads never fail: an I/O error is logged and
//! the read returns an empty result. Usage and interaction writes are
//! telemetry and are logged and swallowed. Feedback writes are user-facing
//! and propagate their errors.

use super::collection::{BackendKind, RecordCollection};
use super::error::StoreResult;
use super::records::{
    AntiPatternInteraction, FeedbackRecord, InteractionAction, StoredRecord, UsageEvent,
};
use crate::calibrate::{
    compute_calibration_data, AntiPatternCalibration, CalibrationConfig, SeverityCatalog,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// How many entries the "top" lists in the stats keep
const TOP_N: usize = 10;

/// Prune the oldest `count - cap` records once a write has pushed the
/// collection over its cap
async fn enforce_cap<R: StoredRecord>(
    records: &dyn RecordCollection<R>,
    cap: usize,
) -> StoreResult<usize> {
    let count = records.count().await?;
    if count <= cap {
        return Ok(0);
    }
    let removed = records.prune_oldest(count - cap).await?;
    debug!(
        "Pruned {} oldest records from '{}' (cap {})",
        removed,
        R::TABLE,
        cap
    );
    Ok(removed)
}

/// Log a failed read and fall back to `T::default()`
fn or_empty<T: Default>(result: StoreResult<T>, table: &str, op: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!("Failed to {} '{}': {}", op, table, e);
        T::default()
    })
}

/// An id and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub id: String,
    pub count: usize,
}

/// Most frequent ids first, ties by id
fn top(counts: BTreeMap<String, usize>) -> Vec<Tally> {
    let mut tallies: Vec<Tally> = counts
        .into_iter()
        .map(|(id, count)| Tally { id, count })
        .collect();
    tallies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));
    tallies.truncate(TOP_N);
    tallies
}

// ---------------------------------------------------------------- feedback

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total: usize,
    pub modified: usize,
    pub rated: usize,
    /// Mean of the ratings given, `None` when nothing is rated
    pub average_rating: Option<f64>,
    pub by_source: BTreeMap<String, usize>,
    pub placement_changes: usize,
    pub top_ignored: Vec<Tally>,
    pub top_fixed: Vec<Tally>,
}

impl FeedbackStats {
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let mut stats = FeedbackStats {
            total: records.len(),
            ..Default::default()
        };
        let mut rating_sum = 0u32;
        let mut ignored = BTreeMap::new();
        let mut fixed = BTreeMap::new();

        for record in records {
            if record.was_modified() {
                stats.modified += 1;
            }
            if let Some(rating) = record.user_rating {
                stats.rated += 1;
                rating_sum += u32::from(rating);
            }
            *stats
                .by_source
                .entry(record.diagram_source.as_str().to_string())
                .or_insert(0) += 1;
            stats.placement_changes += record.placement_changes.len();
            for id in &record.ignored_anti_patterns {
                *ignored.entry(id.clone()).or_insert(0) += 1;
            }
            for id in &record.fixed_anti_patterns {
                *fixed.entry(id.clone()).or_insert(0) += 1;
            }
        }

        if stats.rated > 0 {
            stats.average_rating = Some(f64::from(rating_sum) / stats.rated as f64);
        }
        stats.top_ignored = top(ignored);
        stats.top_fixed = top(fixed);
        stats
    }
}

#[async_trait]
pub trait FeedbackStoreAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Store a record (replacing one with the same id) and apply retention.
    /// An error means the record was not written; a failed retention pass
    /// after a successful write is only logged.
    async fn save(&self, record: &FeedbackRecord) -> StoreResult<()>;

    async fn get(&self, id: &str) -> Option<FeedbackRecord>;

    /// Oldest first
    async fn get_all(&self) -> Vec<FeedbackRecord>;

    async fn by_session(&self, session_id: &str) -> Vec<FeedbackRecord>;

    async fn delete(&self, id: &str) -> StoreResult<bool>;

    async fn count(&self) -> usize;

    async fn clear(&self) -> StoreResult<()>;

    async fn stats(&self) -> FeedbackStats {
        FeedbackStats::from_records(&self.get_all().await)
    }
}

pub struct FeedbackStore {
    records: Box<dyn RecordCollection<FeedbackRecord>>,
    cap: usize,
}

impl FeedbackStore {
    pub fn new(records: Box<dyn RecordCollection<FeedbackRecord>>, cap: usize) -> Self {
        Self { records, cap }
    }
}

#[async_trait]
impl FeedbackStoreAdapter for FeedbackStore {
    fn backend(&self) -> BackendKind {
        self.records.backend()
    }

    async fn save(&self, record: &FeedbackRecord) -> StoreResult<()> {
        record.validate()?;
        self.records.put(record).await?;
        if let Err(e) = enforce_cap(self.records.as_ref(), self.cap).await {
            warn!("Saved feedback {} but pruning failed: {}", record.id, e);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Option<FeedbackRecord> {
        or_empty(self.records.get(id).await, FeedbackRecord::TABLE, "read")
    }

    async fn get_all(&self) -> Vec<FeedbackRecord> {
        or_empty(self.records.all().await, FeedbackRecord::TABLE, "read")
    }

    async fn by_session(&self, session_id: &str) -> Vec<FeedbackRecord> {
        or_empty(
            self.records.by_partition(session_id).await,
            FeedbackRecord::TABLE,
            "read",
        )
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.records.delete(id).await
    }

    async fn count(&self) -> usize {
        or_empty(self.records.count().await, FeedbackRecord::TABLE, "count")
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.clear().await
    }
}

// ------------------------------------------------------------------- usage

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total: usize,
    pub success_rate: f64,
    pub average_confidence: f64,
    pub by_type: BTreeMap<String, usize>,
    pub top_node_types: Vec<Tally>,
    pub sessions: usize,
}

impl UsageStats {
    pub fn from_events(events: &[UsageEvent]) -> Self {
        if events.is_empty() {
            return Self::default();
        }
        let total = events.len();
        let successes = events.iter().filter(|e| e.success).count();
        let confidence: f64 = events.iter().map(|e| e.confidence).sum();

        let mut by_type = BTreeMap::new();
        let mut node_types = BTreeMap::new();
        let mut sessions = BTreeSet::new();
        for event in events {
            let event_type = event.event_type.as_str().to_string();
            *by_type.entry(event_type).or_insert(0) += 1;
            for node_type in &event.node_types {
                *node_types.entry(node_type.clone()).or_insert(0) += 1;
            }
            sessions.insert(event.session_id.as_str());
        }

        UsageStats {
            total,
            success_rate: successes as f64 / total as f64,
            average_confidence: confidence / total as f64,
            by_type,
            top_node_types: top(node_types),
            sessions: sessions.len(),
        }
    }
}

#[async_trait]
pub trait UsageStoreAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Record an event; failures are logged, never returned
    async fn save(&self, event: &UsageEvent);

    async fn get_all(&self) -> Vec<UsageEvent>;

    async fn count(&self) -> usize;

    async fn clear(&self);

    async fn stats(&self) -> UsageStats {
        UsageStats::from_events(&self.get_all().await)
    }
}

pub struct UsageStore {
    events: Box<dyn RecordCollection<UsageEvent>>,
    cap: usize,
}

impl UsageStore {
    pub fn new(events: Box<dyn RecordCollection<UsageEvent>>, cap: usize) -> Self {
        Self { events, cap }
    }

    async fn try_save(&self, event: &UsageEvent) -> StoreResult<()> {
        event.validate()?;
        self.events.put(event).await?;
        enforce_cap(self.events.as_ref(), self.cap).await?;
        Ok(())
    }
}

#[async_trait]
impl UsageStoreAdapter for UsageStore {
    fn backend(&self) -> BackendKind {
        self.events.backend()
    }

    async fn save(&self, event: &UsageEvent) {
        if let Err(e) = self.try_save(event).await {
            warn!("Failed to record usage event {}: {}", event.id, e);
        }
    }

    async fn get_all(&self) -> Vec<UsageEvent> {
        or_empty(self.events.all().await, UsageEvent::TABLE, "read")
    }

    async fn count(&self) -> usize {
        or_empty(self.events.count().await, UsageEvent::TABLE, "count")
    }

    async fn clear(&self) {
        if let Err(e) = self.events.clear().await {
            warn!("Failed to clear '{}': {}", UsageEvent::TABLE, e);
        }
    }
}

// ------------------------------------------------------------ interactions

/// Restricts which interactions `get_interactions` returns; empty matches all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionFilter {
    pub anti_pattern_id: Option<String>,
    pub action: Option<InteractionAction>,
    pub session_id: Option<String>,
    /// Inclusive lower bound on the timestamp
    pub since: Option<DateTime<Utc>>,
}

impl InteractionFilter {
    pub fn for_anti_pattern(id: &str) -> Self {
        Self {
            anti_pattern_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, interaction: &AntiPatternInteraction) -> bool {
        self.anti_pattern_id
            .as_deref()
            .map_or(true, |id| interaction.anti_pattern_id == id)
            && self.action.map_or(true, |a| interaction.action == a)
            && self
                .session_id
                .as_deref()
                .map_or(true, |s| interaction.session_id == s)
            && self.since.map_or(true, |t| interaction.timestamp >= t)
    }
}

#[async_trait]
pub trait CalibrationStoreAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Record an interaction; failures are logged, never returned
    async fn record_interaction(&self, interaction: &AntiPatternInteraction);

    /// Matching interactions, oldest first
    async fn get_interactions(&self, filter: &InteractionFilter) -> Vec<AntiPatternInteraction>;

    async fn count(&self) -> usize;

    async fn clear(&self);

    /// Calibrations over every stored interaction
    async fn calibrations(
        &self,
        catalog: &SeverityCatalog,
        config: &CalibrationConfig,
    ) -> BTreeMap<String, AntiPatternCalibration> {
        let interactions = self.get_interactions(&InteractionFilter::default()).await;
        compute_calibration_data(&interactions, catalog, config)
    }
}

pub struct CalibrationStore {
    interactions: Box<dyn RecordCollection<AntiPatternInteraction>>,
    cap: usize,
}

impl CalibrationStore {
    pub fn new(
        interactions: Box<dyn RecordCollection<AntiPatternInteraction>>,
        cap: usize,
    ) -> Self {
        Self { interactions, cap }
    }

    async fn try_record(&self, interaction: &AntiPatternInteraction) -> StoreResult<()> {
        self.interactions.put(interaction).await?;
        enforce_cap(self.interactions.as_ref(), self.cap).await?;
        Ok(())
    }
}

#[async_trait]
impl CalibrationStoreAdapter for CalibrationStore {
    fn backend(&self) -> BackendKind {
        self.interactions.backend()
    }

    async fn record_interaction(&self, interaction: &AntiPatternInteraction) {
        if let Err(e) = self.try_record(interaction).await {
            warn!(
                "Failed to record {:?} interaction for {}: {}",
                interaction.action, interaction.anti_pattern_id, e
            );
        }
    }

    async fn get_interactions(&self, filter: &InteractionFilter) -> Vec<AntiPatternInteraction> {
        let result = match &filter.anti_pattern_id {
            Some(id) => self.interactions.by_partition(id).await,
            None => self.interactions.all().await,
        };
        let mut interactions = or_empty(result, AntiPatternInteraction::TABLE, "read");
        interactions.retain(|i| filter.matches(i));
        interactions
    }

    async fn count(&self) -> usize {
        or_empty(
            self.interactions.count().await,
            AntiPatternInteraction::TABLE,
            "count",
        )
    }

    async fn clear(&self) {
        if let Err(e) = self.interactions.clear().await {
            warn!("Failed to clear '{}': {}", AntiPatternInteraction::TABLE, e);
        }
    }
}
