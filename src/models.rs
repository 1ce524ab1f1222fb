//! Core data models for topoguard
//!
//! Findings, severities, and the severity-bucketed summaries shared by the
//! security audit, the compliance frameworks, and the calibration engine.

use serde::{Deserialize, Serialize};

/// Severity levels for findings
///
/// Ordered from least to most severe so `Ord` comparisons read naturally
/// (`Severity::Critical > Severity::High`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Report ordering rank: critical=0 … info=4
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Info => 4,
        }
    }

    /// Score deduction applied by the security audit
    pub fn audit_weight(self) -> u32 {
        match self {
            Severity::Critical => 25,
            Severity::High => 15,
            Severity::Medium => 8,
            Severity::Low => 3,
            Severity::Info => 1,
        }
    }

    /// One step less severe (info stays info)
    pub fn downgraded(self) -> Self {
        match self {
            Severity::Critical => Severity::High,
            Severity::High => Severity::Medium,
            Severity::Medium => Severity::Low,
            Severity::Low | Severity::Info => Severity::Info,
        }
    }

    pub fn all() -> &'static [Severity] {
        &[
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(format!(
                "Unknown severity '{}'. Valid: critical, high, medium, low, info",
                other
            )),
        }
    }
}

/// What area of the topology a finding concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCategory {
    Network,
    Encryption,
    AccessControl,
    DataProtection,
    Monitoring,
    Availability,
    Endpoint,
    Compliance,
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FindingCategory::Network => "network",
            FindingCategory::Encryption => "encryption",
            FindingCategory::AccessControl => "access-control",
            FindingCategory::DataProtection => "data-protection",
            FindingCategory::Monitoring => "monitoring",
            FindingCategory::Availability => "availability",
            FindingCategory::Endpoint => "endpoint",
            FindingCategory::Compliance => "compliance",
        };
        f.write_str(s)
    }
}

/// A single rule violation
///
/// Immutable once produced. `id` is the stable rule id (`NET-001`,
/// `PCI-DSS-1.2`, ...) and doubles as the anti-pattern id that user
/// interactions are recorded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub category: FindingCategory,
    #[serde(default)]
    pub affected_nodes: Vec<String>,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

/// Summary of findings by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Sort findings critical-first.
///
/// `sort_by` is stable, so findings of equal severity keep rule declaration
/// order. Report renderers depend on this ordering.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by_key(|f| f.severity.rank());
}

/// Calculate letter grade from a 0-100 score
pub fn grade_from_score(score: u32) -> String {
    match score {
        s if s >= 90 => "A".to_string(),
        s if s >= 80 => "B".to_string(),
        s if s >= 70 => "C".to_string(),
        s if s >= 60 => "D".to_string(),
        _ => "F".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn finding(id: &str, severity: Severity) -> Finding {
        Finding {
            id: id.to_string(),
            title: format!("{id} title"),
            description: String::new(),
            severity,
            category: FindingCategory::Network,
            affected_nodes: vec![],
            recommendation: String::new(),
            references: vec![],
        }
    }

    #[test]
    fn test_rank_orders_critical_first() {
        assert_eq!(Severity::Critical.rank(), 0);
        assert_eq!(Severity::Info.rank(), 4);
        assert!(Severity::Critical > Severity::High);
    }

    #[test]
    fn test_sort_is_stable_within_severity() {
        let mut findings = vec![
            finding("A", Severity::Medium),
            finding("B", Severity::Critical),
            finding("C", Severity::Medium),
            finding("D", Severity::Info),
            finding("E", Severity::Critical),
        ];
        sort_findings(&mut findings);
        let ids: Vec<_> = findings.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "E", "A", "C", "D"]);
    }

    #[test]
    fn test_summary_counts() {
        let findings = vec![
            finding("A", Severity::High),
            finding("B", Severity::High),
            finding("C", Severity::Low),
        ];
        let summary = FindingsSummary::from_findings(&findings);
        assert_eq!(summary.high, 2);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn test_finding_json_uses_camel_case() {
        let mut f = finding("NET-001", Severity::Critical);
        f.affected_nodes = vec!["n1".into()];
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["affectedNodes"][0], "n1");
        assert_eq!(json["severity"], "critical");
        assert!(json.get("references").is_none());
    }

    #[test]
    fn test_grade_bands() {
        assert_eq!(grade_from_score(100), "A");
        assert_eq!(grade_from_score(75), "C");
        assert_eq!(grade_from_score(0), "F");
    }
}
