//! Base rule trait and types

use crate::spec::SpecContext;

/// A single statically-authored check over a topology
///
/// # Example Implementation
///
/// ```ignore
/// struct NoFirewall;
///
/// impl Rule for NoFirewall {
///     type Outcome = Option<Finding>;
///
///     fn id(&self) -> &'static str {
///         "NET-001"
///     }
///
///     fn title(&self) -> &'static str {
///         "Missing firewall"
///     }
///
///     fn check(&self, ctx: &SpecContext<'_>) -> Option<Finding> {
///         None
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// What one evaluation of this rule produces
    type Outcome;

    /// Stable identifier, unique within its rule set
    fn id(&self) -> &'static str;

    /// Short human-readable name
    fn title(&self) -> &'static str;

    /// Evaluate the rule.
    ///
    /// Must be pure: no I/O, no shared mutable state, and it must not panic
    /// for any well-formed spec (including dangling connection endpoints).
    fn check(&self, ctx: &SpecContext<'_>) -> Self::Outcome;
}

/// What a predicate reports when its condition is violated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violation {
    /// Node ids the violation concerns
    pub affected_nodes: Vec<String>,
    /// Extra sentence appended to the rule description
    pub detail: Option<String>,
}

impl Violation {
    pub fn new(affected_nodes: Vec<String>) -> Self {
        Self {
            affected_nodes,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
