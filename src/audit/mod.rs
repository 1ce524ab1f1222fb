//! Security audit
//!
//! Runs the built-in security rule catalog over a topology and scores the
//! result. Rules can be disabled or have their severity overridden through
//! `[audit]` in the project config.

mod rules;

pub use rules::{security_rules, SecurityRule};

use crate::config::AuditConfig;
use crate::models::{grade_from_score, Finding, FindingsSummary};
use crate::rules::RuleEngine;
use crate::scoring::security_score;
use crate::spec::InfraSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of one security audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAuditResult {
    pub timestamp: DateTime<Utc>,
    pub node_count: usize,
    pub connection_count: usize,
    pub rules_evaluated: usize,
    /// Critical first, ties in rule declaration order
    pub findings: Vec<Finding>,
    pub score: u32,
    pub grade: String,
    pub summary: FindingsSummary,
}

impl SecurityAuditResult {
    pub fn finding_ids(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.id.clone()).collect()
    }

    pub fn has_finding(&self, id: &str) -> bool {
        self.findings.iter().any(|f| f.id == id)
    }
}

/// The configured security rule set
pub struct SecurityAudit {
    engine: RuleEngine<SecurityRule>,
}

impl Default for SecurityAudit {
    fn default() -> Self {
        Self::new(&AuditConfig::default())
    }
}

impl SecurityAudit {
    pub fn new(config: &AuditConfig) -> Self {
        let rules = security_rules()
            .into_iter()
            .filter(|r| config.is_rule_enabled(r.id))
            .map(|mut r| {
                if let Some(severity) = config.severity_override(r.id) {
                    r.severity = severity;
                }
                r
            })
            .collect();
        Self {
            engine: RuleEngine::new("security-audit", rules),
        }
    }

    pub fn rules(&self) -> &[SecurityRule] {
        self.engine.rules()
    }

    pub fn run(&self, spec: &InfraSpec) -> SecurityAuditResult {
        let findings = self.engine.evaluate(spec);
        let score = security_score(&findings);
        let summary = FindingsSummary::from_findings(&findings);
        info!(
            "Security audit: {} findings ({} critical), score {}",
            summary.total, summary.critical, score
        );
        SecurityAuditResult {
            timestamp: Utc::now(),
            node_count: spec.nodes.len(),
            connection_count: spec.connections.len(),
            rules_evaluated: self.engine.rule_count(),
            findings,
            score,
            grade: grade_from_score(score),
            summary,
        }
    }
}

/// Audit with the default rule set
pub fn run_security_audit(spec: &InfraSpec) -> SecurityAuditResult {
    SecurityAudit::default().run(spec)
}
