//! Rule framework
//!
//! The security audit and every compliance framework are the same engine
//! shape instantiated with different rule sets:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      RuleEngine<R>                          │
//! │  - Holds an ordered list of rules                           │
//! │  - Builds one SpecContext per evaluation                    │
//! │  - Runs every rule in declaration order                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Rule Trait                           │
//! │  - id(): stable rule id (NET-001, PCI-DSS-1.2, ...)         │
//! │  - check(ctx): pure, total, no I/O                          │
//! └─────────────────────────────────────────────────────────────┘
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │ SecurityRule             │   │ ComplianceCheck              │
//! │ Outcome = Option<Finding>│   │ Outcome = CheckOutcome       │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! Rules are statically authored. One that panics is a bug in the rule, so
//! the engine does not catch panics.

mod base;
mod engine;

pub use base::{Rule, Violation};
pub use engine::RuleEngine;
