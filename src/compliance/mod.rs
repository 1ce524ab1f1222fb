//! Compliance frameworks
//!
//! Six frameworks share one engine shape: an ordered catalog of checks,
//! each yielding pass / fail / partial / not-applicable. Failed checks
//! become findings at the check's severity; partial checks become
//! findings one step lower. The score is the pass ratio from
//! [`compliance_score`], never the audit deduction.

mod controls;
mod frameworks;

pub use controls::{CheckOutcome, CheckStatus};

use crate::models::{sort_findings, Finding, FindingCategory, FindingsSummary, Severity};
use crate::rules::{Rule, RuleEngine};
use crate::scoring::{compliance_score, CheckTally};
use crate::spec::{InfraSpec, SpecContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceFramework {
    #[serde(rename = "isms-p")]
    IsmsP,
    #[serde(rename = "iso27001")]
    Iso27001,
    #[serde(rename = "pci-dss")]
    PciDss,
    #[serde(rename = "gdpr")]
    Gdpr,
    #[serde(rename = "hipaa")]
    Hipaa,
    #[serde(rename = "k-isms")]
    KIsms,
}

impl ComplianceFramework {
    pub fn all() -> &'static [ComplianceFramework] {
        &[
            ComplianceFramework::IsmsP,
            ComplianceFramework::Iso27001,
            ComplianceFramework::PciDss,
            ComplianceFramework::Gdpr,
            ComplianceFramework::Hipaa,
            ComplianceFramework::KIsms,
        ]
    }

    /// Short id used on the command line and in JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceFramework::IsmsP => "isms-p",
            ComplianceFramework::Iso27001 => "iso27001",
            ComplianceFramework::PciDss => "pci-dss",
            ComplianceFramework::Gdpr => "gdpr",
            ComplianceFramework::Hipaa => "hipaa",
            ComplianceFramework::KIsms => "k-isms",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ComplianceFramework::IsmsP => "ISMS-P",
            ComplianceFramework::Iso27001 => "ISO/IEC 27001:2022",
            ComplianceFramework::PciDss => "PCI-DSS v4.0",
            ComplianceFramework::Gdpr => "GDPR",
            ComplianceFramework::Hipaa => "HIPAA Security Rule",
            ComplianceFramework::KIsms => "K-ISMS",
        }
    }

    pub fn checks(&self) -> Vec<ComplianceCheck> {
        frameworks::checks_for(*self)
    }
}

impl std::fmt::Display for ComplianceFramework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for ComplianceFramework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "ismsp" => Ok(ComplianceFramework::IsmsP),
            "iso27001" => Ok(ComplianceFramework::Iso27001),
            "pcidss" => Ok(ComplianceFramework::PciDss),
            "gdpr" => Ok(ComplianceFramework::Gdpr),
            "hipaa" => Ok(ComplianceFramework::Hipaa),
            "kisms" => Ok(ComplianceFramework::KIsms),
            _ => Err(format!(
                "Unknown framework '{}'. Valid: isms-p, iso27001, pci-dss, gdpr, hipaa, k-isms",
                s
            )),
        }
    }
}

/// One numbered requirement of a framework
#[derive(Clone)]
pub struct ComplianceCheck {
    pub framework: ComplianceFramework,
    pub id: &'static str,
    /// Requirement number as the framework writes it
    pub control: &'static str,
    pub title: &'static str,
    pub recommendation: &'static str,
    pub severity: Severity,
    evaluate: fn(&SpecContext<'_>) -> CheckOutcome,
}

impl std::fmt::Debug for ComplianceCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceCheck")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .finish()
    }
}

impl Rule for ComplianceCheck {
    type Outcome = CheckOutcome;

    fn id(&self) -> &'static str {
        self.id
    }

    fn title(&self) -> &'static str {
        self.title
    }

    fn check(&self, ctx: &SpecContext<'_>) -> CheckOutcome {
        (self.evaluate)(ctx)
    }
}

impl ComplianceCheck {
    /// Finding for a failed or partial outcome
    fn finding(&self, outcome: &CheckOutcome) -> Option<Finding> {
        let (severity, qualifier) = match outcome.status {
            CheckStatus::Fail => (self.severity, "not met"),
            CheckStatus::Partial => (self.severity.downgraded(), "partially met"),
            CheckStatus::Pass | CheckStatus::NotApplicable => return None,
        };
        Some(Finding {
            id: self.id.to_string(),
            title: format!(
                "{} {}: {}",
                self.framework.display_name(),
                self.control,
                self.title
            ),
            description: format!(
                "{} requirement {} ({}) is {}.",
                self.framework.display_name(),
                self.control,
                self.title,
                qualifier
            ),
            severity,
            category: FindingCategory::Compliance,
            affected_nodes: outcome.affected_nodes.clone(),
            recommendation: self.recommendation.to_string(),
            references: vec![format!("{} {}", self.framework.display_name(), self.control)],
        })
    }
}

/// Per-check line of a compliance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub id: String,
    pub control: String,
    pub title: String,
    pub status: CheckStatus,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub framework: ComplianceFramework,
    pub framework_name: String,
    pub timestamp: DateTime<Utc>,
    pub node_count: usize,
    pub connection_count: usize,
    pub checks: Vec<CheckResult>,
    pub findings: Vec<Finding>,
    pub tally: CheckTally,
    pub score: u32,
    pub summary: FindingsSummary,
}

/// Evaluate one framework against a spec
pub fn check_compliance(spec: &InfraSpec, framework: ComplianceFramework) -> ComplianceReport {
    let engine = RuleEngine::new(framework.as_str(), framework.checks());
    let mut tally = CheckTally::default();
    let mut checks = Vec::with_capacity(engine.rule_count());
    let mut findings = Vec::new();

    for (check, outcome) in engine.evaluate_all(spec) {
        match outcome.status {
            CheckStatus::Pass => tally.passed += 1,
            CheckStatus::Fail => tally.failed += 1,
            CheckStatus::Partial => tally.partial += 1,
            CheckStatus::NotApplicable => tally.not_applicable += 1,
        }
        if let Some(finding) = check.finding(&outcome) {
            findings.push(finding);
        }
        checks.push(CheckResult {
            id: check.id.to_string(),
            control: check.control.to_string(),
            title: check.title.to_string(),
            status: outcome.status,
            severity: check.severity,
            affected_nodes: outcome.affected_nodes,
        });
    }

    sort_findings(&mut findings);
    let score = compliance_score(&tally);
    info!(
        "{}: {} passed, {} failed, {} partial, {} n/a, score {}",
        framework.display_name(),
        tally.passed,
        tally.failed,
        tally.partial,
        tally.not_applicable,
        score
    );

    ComplianceReport {
        framework,
        framework_name: framework.display_name().to_string(),
        timestamp: Utc::now(),
        node_count: spec.nodes.len(),
        connection_count: spec.connections.len(),
        summary: FindingsSummary::from_findings(&findings),
        checks,
        findings,
        tally,
        score,
    }
}

/// Evaluate every framework, in declaration order
pub fn check_all_frameworks(spec: &InfraSpec) -> Vec<ComplianceReport> {
    ComplianceFramework::all()
        .iter()
        .map(|fw| check_compliance(spec, *fw))
        .collect()
}
