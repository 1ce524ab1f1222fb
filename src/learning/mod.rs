//! The learning loop
//!
//! Ties the differ, the security audit and the stores together. A user's
//! correction of a generated diagram is diffed against the original; audit
//! findings that disappear count as fixed, findings that survive count as
//! ignored. Those interactions feed calibration, and calibration decides
//! which findings the next audit surfaces.

use crate::audit::{SecurityAudit, SecurityAuditResult};
use crate::calibrate::{
    apply_calibration, AntiPatternCalibration, CalibrationConfig, SeverityCatalog,
};
use crate::config::ProjectConfig;
use crate::diff::compute_spec_diff;
use crate::models::{Finding, FindingsSummary};
use crate::spec::InfraSpec;
use crate::store::{
    AntiPatternInteraction, DiagramSource, FeedbackRecord, InteractionAction, StoreResult, Stores,
    UsageEvent, UsageEventType,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A generated diagram and what the user did with it
#[derive(Debug, Clone)]
pub struct Correction {
    pub source: DiagramSource,
    pub original: InfraSpec,
    /// `None` when the user kept the diagram as generated
    pub modified: Option<InfraSpec>,
    pub rating: Option<u8>,
    pub session_id: String,
}

impl Correction {
    pub fn new(source: DiagramSource, original: InfraSpec, session_id: &str) -> Self {
        Self {
            source,
            original,
            modified: None,
            rating: None,
            session_id: session_id.to_string(),
        }
    }

    pub fn modified(mut self, spec: InfraSpec) -> Self {
        self.modified = Some(spec);
        self
    }

    pub fn rated(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }
}

/// An audit with calibration applied
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibratedAudit {
    /// Uncalibrated result; the score is computed from every finding
    pub audit: SecurityAuditResult,
    /// Findings to surface, severities lowered where calibration says so
    pub actionable: Vec<Finding>,
    pub actionable_summary: FindingsSummary,
    pub suppressed: Vec<Finding>,
    /// Findings whose severity calibration changed or suppressed
    pub adjusted: usize,
}

pub struct LearningLoop {
    stores: Stores,
    audit: SecurityAudit,
    catalog: SeverityCatalog,
    calibration: CalibrationConfig,
}

impl LearningLoop {
    pub fn new(stores: Stores, config: &ProjectConfig) -> Self {
        Self {
            stores,
            audit: SecurityAudit::new(&config.audit),
            catalog: SeverityCatalog::with_overrides(&config.audit),
            calibration: config.calibration.clone(),
        }
    }

    /// Replace the severity catalog, e.g. to register custom rule ids
    pub fn with_catalog(mut self, catalog: SeverityCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Diff and audit a correction, then store the feedback record plus one
    /// interaction per finding response
    pub async fn record_correction(&self, correction: Correction) -> StoreResult<FeedbackRecord> {
        let before = self.audit.run(&correction.original);
        let detected = before.finding_ids();

        let mut record = FeedbackRecord::new(
            correction.source,
            correction.original.clone(),
            &correction.session_id,
        );
        record.user_rating = correction.rating;
        record.detected_anti_patterns = detected.clone();

        if let Some(modified) = correction.modified {
            let diff = compute_spec_diff(&correction.original, &modified);
            let after: BTreeSet<String> = self
                .audit
                .run(&modified)
                .finding_ids()
                .into_iter()
                .collect();
            let (ignored, fixed): (Vec<String>, Vec<String>) =
                detected.iter().cloned().partition(|id| after.contains(id));
            debug!(
                "Correction diff: {} operations, {} fixed, {} ignored",
                diff.operations.len(),
                fixed.len(),
                ignored.len()
            );
            record.placement_changes = diff.placement_changes.clone();
            record.spec_diff = diff;
            record.ignored_anti_patterns = ignored;
            record.fixed_anti_patterns = fixed;
            record.user_modified_spec = Some(modified);
        }

        self.stores.feedback.save(&record).await?;

        let session = record.session_id.as_str();
        for id in &record.detected_anti_patterns {
            self.stores
                .calibration
                .record_interaction(&AntiPatternInteraction::new(
                    id,
                    InteractionAction::Shown,
                    session,
                ))
                .await;
        }
        let responses = record
            .ignored_anti_patterns
            .iter()
            .map(|id| (id, InteractionAction::Ignored))
            .chain(
                record
                    .fixed_anti_patterns
                    .iter()
                    .map(|id| (id, InteractionAction::Fixed)),
            );
        for (id, action) in responses {
            self.stores
                .calibration
                .record_interaction(&AntiPatternInteraction::new(id, action, session))
                .await;
        }

        self.stores
            .usage
            .save(&UsageEvent {
                node_types: node_type_names(&correction.original),
                anti_pattern_ids: record.detected_anti_patterns.clone(),
                ..UsageEvent::new(UsageEventType::Modify, true, session)
            })
            .await;

        info!(
            "Recorded feedback {} ({} detected, {} fixed, {} ignored)",
            record.id,
            record.detected_anti_patterns.len(),
            record.fixed_anti_patterns.len(),
            record.ignored_anti_patterns.len()
        );
        Ok(record)
    }

    /// Record a direct response to one finding
    pub async fn record_interaction(
        &self,
        anti_pattern_id: &str,
        action: InteractionAction,
        session_id: &str,
    ) {
        self.stores
            .calibration
            .record_interaction(&AntiPatternInteraction::new(anti_pattern_id, action, session_id))
            .await;
    }

    /// Recompute calibrations from every stored interaction
    pub async fn recalibrate(&self) -> BTreeMap<String, AntiPatternCalibration> {
        let calibrations = self
            .stores
            .calibration
            .calibrations(&self.catalog, &self.calibration)
            .await;
        info!(
            "Recalibrated {} anti-patterns ({} adjusted)",
            calibrations.len(),
            calibrations.values().filter(|c| c.is_adjusted()).count()
        );
        calibrations
    }

    /// Audit a spec and surface findings the way users have taught us to
    pub async fn calibrated_audit(&self, spec: &InfraSpec, session_id: &str) -> CalibratedAudit {
        let audit = self.audit.run(spec);
        let calibrations = self.recalibrate().await;
        let calibrated = apply_calibration(audit.findings.clone(), &calibrations);

        let adjusted = calibrated.suppressed.len()
            + calibrated
                .actionable
                .iter()
                .filter(|f| {
                    audit
                        .findings
                        .iter()
                        .any(|orig| orig.id == f.id && orig.severity != f.severity)
                })
                .count();

        self.stores
            .usage
            .save(&UsageEvent {
                node_types: node_type_names(spec),
                anti_pattern_ids: audit.finding_ids(),
                ..UsageEvent::new(UsageEventType::Audit, true, session_id)
            })
            .await;

        CalibratedAudit {
            actionable_summary: FindingsSummary::from_findings(&calibrated.actionable),
            actionable: calibrated.actionable,
            suppressed: calibrated.suppressed,
            adjusted,
            audit,
        }
    }
}

fn node_type_names(spec: &InfraSpec) -> Vec<String> {
    spec.node_types()
        .into_iter()
        .map(|t| t.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::CalibratedSeverity;
    use crate::config::RetentionConfig;
    use crate::models::Severity;
    use crate::spec::{FlowType, NodeSpec, NodeType, Tier};
    use crate::store::InteractionFilter;

    fn exposed_web() -> InfraSpec {
        InfraSpec::new()
            .with_node(NodeSpec::new("inet", NodeType::Internet))
            .with_node(NodeSpec::in_tier("web", NodeType::WebServer, Tier::Dmz))
            .connect("inet", "web", FlowType::Request)
    }

    fn with_firewall() -> InfraSpec {
        InfraSpec::new()
            .with_node(NodeSpec::new("inet", NodeType::Internet))
            .with_node(NodeSpec::in_tier("fw", NodeType::Firewall, Tier::Dmz))
            .with_node(NodeSpec::in_tier("web", NodeType::WebServer, Tier::Dmz))
            .connect("inet", "fw", FlowType::Request)
            .connect("fw", "web", FlowType::Request)
    }

    fn learning() -> LearningLoop {
        LearningLoop::new(
            Stores::in_memory(&RetentionConfig::default()),
            &ProjectConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_correction_marks_fixed_and_ignored() {
        let learning = learning();
        let record = learning
            .record_correction(
                Correction::new(DiagramSource::LlmModify, exposed_web(), "s1")
                    .modified(with_firewall())
                    .rated(4),
            )
            .await
            .unwrap();

        let has = |list: &[String], id: &str| list.iter().any(|x| x == id);
        assert!(has(&record.detected_anti_patterns, "NET-001"));
        assert!(has(&record.fixed_anti_patterns, "NET-001"));
        assert!(has(&record.ignored_anti_patterns, "NET-002"));
        assert_eq!(
            record.fixed_anti_patterns.len() + record.ignored_anti_patterns.len(),
            record.detected_anti_patterns.len()
        );
        assert!(!record.spec_diff.is_empty());
        assert_eq!(record.user_rating, Some(4));

        let stores = learning.stores();
        assert_eq!(stores.feedback.count().await, 1);
        let fixed = stores
            .calibration
            .get_interactions(&InteractionFilter {
                action: Some(InteractionAction::Fixed),
                ..Default::default()
            })
            .await;
        assert!(fixed.iter().any(|i| i.anti_pattern_id == "NET-001"));
        assert_eq!(stores.usage.count().await, 1);
    }

    #[tokio::test]
    async fn test_unmodified_correction_only_records_shown() {
        let learning = learning();
        let record = learning
            .record_correction(Correction::new(DiagramSource::Template, exposed_web(), "s1"))
            .await
            .unwrap();
        assert!(record.fixed_anti_patterns.is_empty());
        assert!(record.ignored_anti_patterns.is_empty());
        assert_eq!(
            learning.stores().calibration.count().await,
            record.detected_anti_patterns.len()
        );
    }

    #[tokio::test]
    async fn test_bad_rating_is_rejected_before_interactions() {
        let learning = learning();
        let result = learning
            .record_correction(
                Correction::new(DiagramSource::Template, exposed_web(), "s1").rated(0),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(learning.stores().calibration.count().await, 0);
    }

    #[tokio::test]
    async fn test_ignored_findings_get_suppressed() {
        let learning = learning();
        for _ in 0..6 {
            learning
                .record_correction(
                    Correction::new(DiagramSource::LlmModify, exposed_web(), "s1")
                        .modified(with_firewall()),
                )
                .await
                .unwrap();
        }

        let calibrations = learning.recalibrate().await;
        // Fixed every time: never lowered
        assert_eq!(
            calibrations["NET-001"].calibrated_severity,
            CalibratedSeverity::Critical
        );
        // Ignored every time: high drops two steps
        assert_eq!(
            calibrations["NET-002"].calibrated_severity,
            CalibratedSeverity::Suppressed
        );

        let result = learning.calibrated_audit(&exposed_web(), "s2").await;
        assert!(result.audit.has_finding("NET-002"));
        assert!(result.suppressed.iter().any(|f| f.id == "NET-002"));
        assert!(result.actionable.iter().all(|f| f.id != "NET-002"));
        let net001 = result.actionable.iter().find(|f| f.id == "NET-001").unwrap();
        assert_eq!(net001.severity, Severity::Critical);
        assert!(result.adjusted >= 1);
        assert_eq!(
            result.actionable.len() + result.suppressed.len(),
            result.audit.findings.len()
        );
    }
}
