//! Score computations

use crate::models::Finding;
use serde::{Deserialize, Serialize};

/// Severity-weighted deduction score for a security audit
pub fn security_score(findings: &[Finding]) -> u32 {
    let deduction: u32 = findings.iter().map(|f| f.severity.audit_weight()).sum();
    100u32.saturating_sub(deduction)
}

/// Outcome counts of a compliance run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTally {
    pub passed: usize,
    pub failed: usize,
    pub partial: usize,
    pub not_applicable: usize,
}

impl CheckTally {
    pub fn applicable(&self) -> usize {
        self.passed + self.failed + self.partial
    }

    pub fn total(&self) -> usize {
        self.applicable() + self.not_applicable
    }
}

/// Pass/partial ratio score for a compliance run
pub fn compliance_score(tally: &CheckTally) -> u32 {
    let applicable = tally.applicable();
    if applicable == 0 {
        return 100;
    }
    let earned = tally.passed as f64 + 0.5 * tally.partial as f64;
    (100.0 * earned / applicable as f64).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::finding;
    use crate::models::Severity;

    #[test]
    fn test_no_findings_is_perfect() {
        assert_eq!(security_score(&[]), 100);
    }

    #[test]
    fn test_weights() {
        let findings = vec![
            finding("a", Severity::Critical),
            finding("b", Severity::High),
            finding("c", Severity::Medium),
            finding("d", Severity::Low),
            finding("e", Severity::Info),
        ];
        assert_eq!(security_score(&findings), 100 - 25 - 15 - 8 - 3 - 1);
    }

    #[test]
    fn test_clamps_at_zero() {
        let findings: Vec<_> = (0..5)
            .map(|i| finding(&format!("c{i}"), Severity::Critical))
            .collect();
        assert_eq!(security_score(&findings), 0);
    }

    #[test]
    fn test_extra_critical_never_raises_score() {
        let mut findings = vec![finding("a", Severity::Medium), finding("b", Severity::Low)];
        let mut last = security_score(&findings);
        for i in 0..6 {
            findings.push(finding(&format!("c{i}"), Severity::Critical));
            let next = security_score(&findings);
            assert!(next < last || next == 0);
            last = next;
        }
    }

    #[test]
    fn test_compliance_ratio() {
        let tally = CheckTally {
            passed: 3,
            failed: 1,
            partial: 2,
            not_applicable: 4,
        };
        // (3 + 1) / 6 = 66.67
        assert_eq!(compliance_score(&tally), 67);
        assert_eq!(tally.total(), 10);
    }

    #[test]
    fn test_compliance_all_not_applicable() {
        let tally = CheckTally {
            not_applicable: 5,
            ..Default::default()
        };
        assert_eq!(compliance_score(&tally), 100);
    }

    #[test]
    fn test_compliance_all_failed() {
        let tally = CheckTally {
            failed: 3,
            ..Default::default()
        };
        assert_eq!(compliance_score(&tally), 0);
    }
}
