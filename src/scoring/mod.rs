//! Scoring
//!
//! Two deliberately different formulas. The audit score penalizes absolute
//! risk; the compliance score measures coverage. They must not be merged.
//!
//! # Security audit
//!
//! ```text
//! score = max(0, 100 − Σ weight(severity))
//!
//!   critical 25 | high 15 | medium 8 | low 3 | info 1
//! ```
//!
//! The sum is not capped before clamping, so a handful of criticals
//! bottoms out at 0.
//!
//! # Compliance
//!
//! ```text
//! score = round(100 × (passed + 0.5 × partial) / (passed + failed + partial))
//! ```
//!
//! Not-applicable checks are left out of the denominator. When every check
//! is not applicable the score is 100.

mod scorer;

pub use scorer::{compliance_score, security_score, CheckTally};
