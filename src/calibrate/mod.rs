//! Adaptive severity calibration
//!
//! Aggregates how users respond to each finding (shown, ignored, fixed)
//! into per-anti-pattern calibrations. Findings users keep ignoring are
//! lowered or suppressed; findings users fix keep their severity.

mod catalog;
mod engine;
mod policy;

pub use catalog::SeverityCatalog;
pub use engine::{
    apply_calibration, compute_calibration_data, AntiPatternCalibration, CalibratedFindings,
};
pub use policy::{CalibratedSeverity, CalibrationConfig};
