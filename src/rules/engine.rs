//! Ordered rule execution

use crate::models::{sort_findings, Finding};
use crate::rules::base::Rule;
use crate::spec::{InfraSpec, SpecContext};
use std::time::Instant;
use tracing::debug;

/// Runs an ordered rule set against a spec
///
/// Evaluation is single-threaded and deterministic: the same spec always
/// produces the same outcomes in the same order.
pub struct RuleEngine<R: Rule> {
    name: &'static str,
    rules: Vec<R>,
}

impl<R: Rule> RuleEngine<R> {
    pub fn new(name: &'static str, rules: Vec<R>) -> Self {
        Self { name, rules }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rules(&self) -> &[R] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate every rule in declaration order, pairing each rule with its
    /// outcome
    pub fn evaluate_all<'r>(&'r self, spec: &InfraSpec) -> Vec<(&'r R, R::Outcome)> {
        let start = Instant::now();
        let ctx = SpecContext::new(spec);
        let outcomes: Vec<_> = self
            .rules
            .iter()
            .map(|rule| (rule, rule.check(&ctx)))
            .collect();
        debug!(
            "{}: evaluated {} rules over {} nodes in {:?}",
            self.name,
            self.rules.len(),
            spec.nodes.len(),
            start.elapsed()
        );
        outcomes
    }
}

impl<R: Rule<Outcome = Option<Finding>>> RuleEngine<R> {
    /// Evaluate and return findings, critical first.
    ///
    /// Findings of equal severity keep rule declaration order.
    pub fn evaluate(&self, spec: &InfraSpec) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self
            .evaluate_all(spec)
            .into_iter()
            .filter_map(|(_, outcome)| outcome)
            .collect();
        sort_findings(&mut findings);
        debug!("{}: {} findings", self.name, findings.len());
        findings
    }
}
