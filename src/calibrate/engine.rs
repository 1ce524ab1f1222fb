use super::catalog::SeverityCatalog;
use super::policy::{CalibratedSeverity, CalibrationConfig};
use crate::models::{sort_findings, Finding};
use crate::store::{AntiPatternInteraction, InteractionAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How users have responded to one anti-pattern, and what that does to
/// its severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiPatternCalibration {
    pub anti_pattern_id: String,
    pub total_shown: u32,
    pub ignored_count: u32,
    pub fixed_count: u32,
    pub ignore_rate: f64,
    pub fix_rate: f64,
    pub original_severity: crate::models::Severity,
    pub calibrated_severity: CalibratedSeverity,
    /// Timestamp of the newest interaction counted
    pub last_updated: DateTime<Utc>,
}

impl AntiPatternCalibration {
    /// Whether calibration lowered the severity
    pub fn is_adjusted(&self) -> bool {
        self.calibrated_severity < CalibratedSeverity::from(self.original_severity)
    }
}

#[derive(Default)]
struct Counts {
    shown: u32,
    ignored: u32,
    fixed: u32,
    last: Option<DateTime<Utc>>,
}

fn rate(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total)
    }
}

/// Aggregate interactions into one calibration per anti-pattern id
///
/// `total_shown` is `max(shown, ignored + fixed)` so interactions recorded
/// without a matching "shown" event still count, which keeps both rates
/// within [0, 1].
pub fn compute_calibration_data(
    interactions: &[AntiPatternInteraction],
    catalog: &SeverityCatalog,
    config: &CalibrationConfig,
) -> BTreeMap<String, AntiPatternCalibration> {
    let config = config.sanitized();
    let mut counts: BTreeMap<&str, Counts> = BTreeMap::new();
    for interaction in interactions {
        let entry = counts
            .entry(interaction.anti_pattern_id.as_str())
            .or_default();
        match interaction.action {
            InteractionAction::Shown => entry.shown += 1,
            InteractionAction::Ignored => entry.ignored += 1,
            InteractionAction::Fixed => entry.fixed += 1,
        }
        entry.last = entry.last.max(Some(interaction.timestamp));
    }

    let calibrations: BTreeMap<String, AntiPatternCalibration> = counts
        .into_iter()
        .map(|(id, c)| {
            let total_shown = c.shown.max(c.ignored + c.fixed);
            let ignore_rate = rate(c.ignored, total_shown);
            let fix_rate = rate(c.fixed, total_shown);
            let original_severity = catalog.severity_of(id);
            let calibrated_severity =
                config.calibrate(original_severity, total_shown, ignore_rate, fix_rate);
            let calibration = AntiPatternCalibration {
                anti_pattern_id: id.to_string(),
                total_shown,
                ignored_count: c.ignored,
                fixed_count: c.fixed,
                ignore_rate,
                fix_rate,
                original_severity,
                calibrated_severity,
                last_updated: c.last.unwrap_or_default(),
            };
            (id.to_string(), calibration)
        })
        .collect();

    debug!(
        "Calibrated {} anti-patterns from {} interactions ({} adjusted)",
        calibrations.len(),
        interactions.len(),
        calibrations.values().filter(|c| c.is_adjusted()).count()
    );
    calibrations
}

/// Findings split by calibration outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibratedFindings {
    /// Still reported, critical first
    pub actionable: Vec<Finding>,
    /// Hidden by calibration, original severity kept
    pub suppressed: Vec<Finding>,
}

/// Rewrite finding severities from calibrations
///
/// Calibration only ever lowers a finding. Findings with no calibration
/// pass through untouched.
pub fn apply_calibration(
    findings: Vec<Finding>,
    calibrations: &BTreeMap<String, AntiPatternCalibration>,
) -> CalibratedFindings {
    let mut result = CalibratedFindings::default();
    for mut finding in findings {
        let Some(calibration) = calibrations.get(&finding.id) else {
            result.actionable.push(finding);
            continue;
        };
        if calibration.calibrated_severity >= CalibratedSeverity::from(finding.severity) {
            result.actionable.push(finding);
            continue;
        }
        match calibration.calibrated_severity.as_severity() {
            Some(severity) => {
                finding.severity = severity;
                result.actionable.push(finding);
            }
            None => result.suppressed.push(finding),
        }
    }
    sort_findings(&mut result.actionable);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::finding;
    use crate::models::Severity;

    fn interactions(
        id: &str,
        shown: usize,
        ignored: usize,
        fixed: usize,
    ) -> Vec<AntiPatternInteraction> {
        let mut out = Vec::new();
        for _ in 0..shown {
            out.push(AntiPatternInteraction::new(id, InteractionAction::Shown, "s"));
        }
        for _ in 0..ignored {
            out.push(AntiPatternInteraction::new(id, InteractionAction::Ignored, "s"));
        }
        for _ in 0..fixed {
            out.push(AntiPatternInteraction::new(id, InteractionAction::Fixed, "s"));
        }
        out
    }

    fn compute(list: &[AntiPatternInteraction]) -> BTreeMap<String, AntiPatternCalibration> {
        compute_calibration_data(
            list,
            &SeverityCatalog::builtin(),
            &CalibrationConfig::default(),
        )
    }

    #[test]
    fn test_rates_and_totals() {
        let calibrations = compute(&interactions("NET-002", 10, 7, 1));
        let c = &calibrations["NET-002"];
        assert_eq!(c.total_shown, 10);
        assert_eq!(c.ignored_count, 7);
        assert!((c.ignore_rate - 0.7).abs() < 1e-9);
        assert!((c.fix_rate - 0.1).abs() < 1e-9);
        assert_eq!(c.original_severity, Severity::High);
        assert_eq!(c.calibrated_severity, CalibratedSeverity::Medium);
        assert!(c.is_adjusted());
    }

    #[test]
    fn test_total_shown_covers_unshown_responses() {
        let calibrations = compute(&interactions("MON-001", 0, 6, 0));
        let c = &calibrations["MON-001"];
        assert_eq!(c.total_shown, 6);
        assert_eq!(c.ignore_rate, 1.0);
        assert_eq!(c.calibrated_severity, CalibratedSeverity::Suppressed);
    }

    #[test]
    fn test_empty_input() {
        assert!(compute(&[]).is_empty());
    }

    #[test]
    fn test_apply_only_lowers() {
        let mut list = interactions("NET-002", 10, 9, 0);
        list.extend(interactions("NET-006", 10, 0, 0));
        let calibrations = compute(&list);

        let findings = vec![
            finding("NET-006", Severity::Low),
            finding("NET-002", Severity::High),
            finding("NET-001", Severity::Critical),
        ];
        let result = apply_calibration(findings, &calibrations);
        let ids: Vec<_> = result.actionable.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["NET-001", "NET-006"]);
        // Low stays low even though the calibration bucket is medium
        assert_eq!(result.actionable[1].severity, Severity::Low);
        assert_eq!(result.suppressed.len(), 1);
        assert_eq!(result.suppressed[0].severity, Severity::High);
    }
}
