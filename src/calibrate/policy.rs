//! Severity calibration policy
//!
//! Guardrails against a few users silencing real problems:
//! 1. Nothing changes until a finding has been shown `min_samples` times
//! 2. A high fix rate restores the original severity outright
//! 3. Ignore rates lower severity at most two steps
//! 4. Critical findings never drop below `critical_min_severity`

use crate::models::Severity;
use serde::{Deserialize, Serialize};

/// Severity after calibration
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibratedSeverity {
    Suppressed,
    Medium,
    High,
    Critical,
}

impl CalibratedSeverity {
    /// One step less severe
    pub fn lowered(self) -> Self {
        match self {
            CalibratedSeverity::Critical => CalibratedSeverity::High,
            CalibratedSeverity::High => CalibratedSeverity::Medium,
            CalibratedSeverity::Medium | CalibratedSeverity::Suppressed => {
                CalibratedSeverity::Suppressed
            }
        }
    }

    /// Finding severity to report, `None` when suppressed
    pub fn as_severity(self) -> Option<Severity> {
        match self {
            CalibratedSeverity::Critical => Some(Severity::Critical),
            CalibratedSeverity::High => Some(Severity::High),
            CalibratedSeverity::Medium => Some(Severity::Medium),
            CalibratedSeverity::Suppressed => None,
        }
    }
}

impl From<Severity> for CalibratedSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => CalibratedSeverity::Critical,
            Severity::High => CalibratedSeverity::High,
            Severity::Medium | Severity::Low | Severity::Info => CalibratedSeverity::Medium,
        }
    }
}

impl std::fmt::Display for CalibratedSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibratedSeverity::Suppressed => write!(f, "suppressed"),
            CalibratedSeverity::Medium => write!(f, "medium"),
            CalibratedSeverity::High => write!(f, "high"),
            CalibratedSeverity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_min_samples")]
    pub min_samples: u32,
    #[serde(default = "default_ignore_threshold")]
    pub ignore_threshold: f64,
    #[serde(default = "default_strong_ignore_threshold")]
    pub strong_ignore_threshold: f64,
    #[serde(default = "default_fix_threshold")]
    pub fix_threshold: f64,
    #[serde(default = "default_critical_min_severity")]
    pub critical_min_severity: Severity,
}

fn default_min_samples() -> u32 {
    5
}

fn default_ignore_threshold() -> f64 {
    0.6
}

fn default_strong_ignore_threshold() -> f64 {
    0.85
}

fn default_fix_threshold() -> f64 {
    0.5
}

fn default_critical_min_severity() -> Severity {
    Severity::High
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
            ignore_threshold: default_ignore_threshold(),
            strong_ignore_threshold: default_strong_ignore_threshold(),
            fix_threshold: default_fix_threshold(),
            critical_min_severity: default_critical_min_severity(),
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

impl CalibrationConfig {
    /// Rates clamped into [0, 1], strong threshold no lower than the first.
    /// Non-finite values (TOML accepts `nan` and `inf`) fall back to their
    /// defaults.
    pub fn sanitized(&self) -> Self {
        let ignore = finite_or(self.ignore_threshold, default_ignore_threshold());
        let ignore = ignore.clamp(0.0, 1.0);
        let strong = finite_or(
            self.strong_ignore_threshold,
            default_strong_ignore_threshold(),
        );
        let fix = finite_or(self.fix_threshold, default_fix_threshold());
        Self {
            min_samples: self.min_samples,
            ignore_threshold: ignore,
            strong_ignore_threshold: strong.clamp(ignore, 1.0),
            fix_threshold: fix.clamp(0.0, 1.0),
            critical_min_severity: self.critical_min_severity,
        }
    }

    /// Calibrated severity for one anti-pattern
    pub fn calibrate(
        &self,
        original: Severity,
        total_shown: u32,
        ignore_rate: f64,
        fix_rate: f64,
    ) -> CalibratedSeverity {
        let base = CalibratedSeverity::from(original);
        if total_shown < self.min_samples || fix_rate >= self.fix_threshold {
            return base;
        }

        let lowered = if ignore_rate > self.strong_ignore_threshold {
            base.lowered().lowered()
        } else if ignore_rate > self.ignore_threshold {
            base.lowered()
        } else {
            base
        };

        if original == Severity::Critical {
            lowered.max(CalibratedSeverity::from(self.critical_min_severity))
        } else {
            lowered
        }
    }
}
