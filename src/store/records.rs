//! Records persisted by the learning stores

use super::error::{StoreError, StoreResult};
use crate::diff::{PlacementChange, SpecDiff};
use crate::spec::InfraSpec;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record a `RecordCollection` can hold
///
/// Records are keyed by `id` (writes are idempotent puts), pruned by
/// `timestamp`, and indexed by `partition_key` for filtered reads.
pub trait StoredRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Primary table name
    const TABLE: &'static str;
    /// `(timestamp, id)` index table name
    const TIMESTAMP_INDEX: &'static str;
    /// `(partition, timestamp, id)` index table name
    const PARTITION_INDEX: &'static str;

    fn id(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn partition_key(&self) -> &str;
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Where a diagram came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramSource {
    LocalParser,
    LlmModify,
    Template,
}

impl DiagramSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramSource::LocalParser => "local-parser",
            DiagramSource::LlmModify => "llm-modify",
            DiagramSource::Template => "template",
        }
    }
}

impl std::str::FromStr for DiagramSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local-parser" => Ok(DiagramSource::LocalParser),
            "llm-modify" => Ok(DiagramSource::LlmModify),
            "template" => Ok(DiagramSource::Template),
            other => Err(format!(
                "Unknown diagram source '{}'. Valid: local-parser, llm-modify, template",
                other
            )),
        }
    }
}

/// One generation session and how the user corrected it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub diagram_source: DiagramSource,
    pub original_spec: InfraSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_modified_spec: Option<InfraSpec>,
    /// 1 to 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<u8>,
    #[serde(default)]
    pub spec_diff: SpecDiff,
    #[serde(default)]
    pub placement_changes: Vec<PlacementChange>,
    #[serde(default)]
    pub detected_anti_patterns: Vec<String>,
    #[serde(default)]
    pub ignored_anti_patterns: Vec<String>,
    #[serde(default)]
    pub fixed_anti_patterns: Vec<String>,
    pub session_id: String,
}

impl FeedbackRecord {
    pub fn new(diagram_source: DiagramSource, original_spec: InfraSpec, session_id: &str) -> Self {
        Self {
            id: new_id(),
            timestamp: Utc::now(),
            diagram_source,
            original_spec,
            user_modified_spec: None,
            user_rating: None,
            spec_diff: SpecDiff::default(),
            placement_changes: Vec::new(),
            detected_anti_patterns: Vec::new(),
            ignored_anti_patterns: Vec::new(),
            fixed_anti_patterns: Vec::new(),
            session_id: session_id.to_string(),
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.user_rating = Some(rating);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn was_modified(&self) -> bool {
        self.user_modified_spec.is_some()
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        match self.user_rating {
            Some(r) if !(1..=5).contains(&r) => Err(StoreError::InvalidRecord(format!(
                "rating {} out of range 1-5",
                r
            ))),
            _ => Ok(()),
        }
    }
}

impl StoredRecord for FeedbackRecord {
    const TABLE: &'static str = "feedback";
    const TIMESTAMP_INDEX: &'static str = "feedback_by_time";
    const PARTITION_INDEX: &'static str = "feedback_by_session";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn partition_key(&self) -> &str {
        &self.session_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageEventType {
    Generate,
    Modify,
    Template,
    Audit,
    Compliance,
    WhatIf,
    Export,
    #[serde(other)]
    Other,
}

impl UsageEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageEventType::Generate => "generate",
            UsageEventType::Modify => "modify",
            UsageEventType::Template => "template",
            UsageEventType::Audit => "audit",
            UsageEventType::Compliance => "compliance",
            UsageEventType::WhatIf => "what-if",
            UsageEventType::Export => "export",
            UsageEventType::Other => "other",
        }
    }
}

impl std::str::FromStr for UsageEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "generate" => UsageEventType::Generate,
            "modify" => UsageEventType::Modify,
            "template" => UsageEventType::Template,
            "audit" => UsageEventType::Audit,
            "compliance" => UsageEventType::Compliance,
            "what-if" | "whatif" => UsageEventType::WhatIf,
            "export" => UsageEventType::Export,
            _ => UsageEventType::Other,
        })
    }
}

/// One user action worth counting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: UsageEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub success: bool,
    /// Parser or model confidence, 0.0 to 1.0
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub node_types: Vec<String>,
    #[serde(default)]
    pub pattern_ids: Vec<String>,
    #[serde(default)]
    pub anti_pattern_ids: Vec<String>,
    pub session_id: String,
}

impl UsageEvent {
    pub fn new(event_type: UsageEventType, success: bool, session_id: &str) -> Self {
        Self {
            id: new_id(),
            timestamp: Utc::now(),
            event_type,
            prompt: None,
            success,
            confidence: 0.0,
            node_types: Vec::new(),
            pattern_ids: Vec::new(),
            anti_pattern_ids: Vec::new(),
            session_id: session_id.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.prompt = Some(prompt.to_string());
        self
    }

    /// Clamped into [0, 1]; NaN and infinities become 0.0
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// JSON cannot hold a non-finite confidence, so refuse to store one
    pub(crate) fn validate(&self) -> StoreResult<()> {
        if !self.confidence.is_finite() {
            return Err(StoreError::InvalidRecord(format!(
                "confidence {} is not a finite number",
                self.confidence
            )));
        }
        Ok(())
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl StoredRecord for UsageEvent {
    const TABLE: &'static str = "usage";
    const TIMESTAMP_INDEX: &'static str = "usage_by_time";
    const PARTITION_INDEX: &'static str = "usage_by_session";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn partition_key(&self) -> &str {
        &self.session_id
    }
}

/// How the user responded to a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Shown,
    Ignored,
    Fixed,
}

impl std::str::FromStr for InteractionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shown" => Ok(InteractionAction::Shown),
            "ignored" => Ok(InteractionAction::Ignored),
            "fixed" => Ok(InteractionAction::Fixed),
            other => Err(format!(
                "Unknown action '{}'. Valid: shown, ignored, fixed",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiPatternInteraction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub anti_pattern_id: String,
    pub action: InteractionAction,
    pub session_id: String,
}

impl AntiPatternInteraction {
    pub fn new(anti_pattern_id: &str, action: InteractionAction, session_id: &str) -> Self {
        Self {
            id: new_id(),
            timestamp: Utc::now(),
            anti_pattern_id: anti_pattern_id.to_string(),
            action,
            session_id: session_id.to_string(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl StoredRecord for AntiPatternInteraction {
    const TABLE: &'static str = "interactions";
    const TIMESTAMP_INDEX: &'static str = "interactions_by_time";
    const PARTITION_INDEX: &'static str = "interactions_by_anti_pattern";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn partition_key(&self) -> &str {
        &self.anti_pattern_id
    }
}
