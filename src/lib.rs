//! topoguard - infrastructure topology auditing
//!
//! Audits a declarative topology (`InfraSpec`) against security rules and
//! compliance frameworks, predicts the effect of adding or removing a node,
//! diffs user edits against generated diagrams, and learns from how users
//! respond to findings to recalibrate their severity.
//!
//! ```no_run
//! use topoguard::audit::run_security_audit;
//! use topoguard::spec::{FlowType, InfraSpec, NodeSpec, NodeType};
//!
//! let spec = InfraSpec::new()
//!     .with_node(NodeSpec::new("inet", NodeType::Internet))
//!     .with_node(NodeSpec::new("web", NodeType::WebServer))
//!     .connect("inet", "web", FlowType::Request);
//! let result = run_security_audit(&spec);
//! assert!(result.has_finding("NET-001"));
//! ```

pub mod audit;
pub mod calibrate;
pub mod cli;
pub mod compliance;
pub mod config;
pub mod diff;
pub mod learning;
pub mod models;
pub mod reporters;
pub mod rules;
pub mod scoring;
pub mod spec;
pub mod store;
pub mod whatif;
