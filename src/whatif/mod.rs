//! What-if impact simulation
//!
//! Predicts how adding or removing one node changes the security posture.
//! The prediction is a fixed table lookup on the node's kind and category,
//! plus a count of the connections a removal would sever. It never re-runs
//! the audit, so it is cheap enough to call while the user hovers over a
//! palette entry.
//!
//! `risk_delta` is signed from the posture's point of view: positive means
//! the change improves security, negative means it adds risk.

use crate::models::Severity;
use crate::spec::{InfraSpec, NodeCategory, NodeType, PUBLIC_SERVICE_TYPES};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactCategory {
    Security,
    Availability,
    Compliance,
    Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactKind {
    Improvement,
    Regression,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub category: ImpactCategory,
    pub severity: Severity,
    pub description: String,
    pub kind: ImpactKind,
}

impl Impact {
    fn new(
        category: ImpactCategory,
        severity: Severity,
        kind: ImpactKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category,
            severity,
            description: description.into(),
            kind,
        }
    }

    fn improvement(
        category: ImpactCategory,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self::new(category, severity, ImpactKind::Improvement, description)
    }

    fn regression(
        category: ImpactCategory,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self::new(category, severity, ImpactKind::Regression, description)
    }
}

/// What the simulated change was
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ChangeDescriptor {
    Add {
        #[serde(rename = "nodeType")]
        node_type: NodeType,
    },
    Remove {
        #[serde(rename = "nodeId")]
        node_id: String,
        /// Absent when the id did not exist
        #[serde(rename = "nodeType", skip_serializing_if = "Option::is_none")]
        node_type: Option<NodeType>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfResult {
    pub change: ChangeDescriptor,
    pub impacts: Vec<Impact>,
    pub risk_delta: i32,
    pub recommendations: Vec<String>,
}

impl WhatIfResult {
    fn new(change: ChangeDescriptor) -> Self {
        Self {
            change,
            impacts: Vec::new(),
            risk_delta: 0,
            recommendations: Vec::new(),
        }
    }

    fn push(&mut self, impact: Impact, delta: i32) {
        self.impacts.push(impact);
        self.risk_delta += delta;
    }

    fn recommend(&mut self, text: impl Into<String>) {
        self.recommendations.push(text.into());
    }

    /// A result that predicts nothing at all
    pub fn is_no_op(&self) -> bool {
        self.impacts.is_empty() && self.risk_delta == 0
    }
}

const AUTH_TYPES: &[NodeType] = &[
    NodeType::Sso,
    NodeType::Mfa,
    NodeType::Iam,
    NodeType::Pam,
    NodeType::LdapAd,
];

const MONITORING_TYPES: &[NodeType] = &[
    NodeType::Siem,
    NodeType::Logging,
    NodeType::Monitoring,
    NodeType::Apm,
    NodeType::Soar,
];

const PROTECTION_ADD_DELTA: i32 = 15;
const PROTECTION_REMOVE_DELTA: i32 = -25;
const SEVERED_EDGE_DELTA: i32 = -3;

/// Predict the effect of adding one node of `node_type`
pub fn analyze_what_if_add(spec: &InfraSpec, node_type: NodeType) -> WhatIfResult {
    use ImpactCategory::*;

    let mut result = WhatIfResult::new(ChangeDescriptor::Add {
        node_type: node_type.clone(),
    });
    let has = |t: NodeType| spec.nodes.iter().any(|n| n.node_type == t);

    if node_type.is_protection() {
        result.push(
            Impact::improvement(
                Security,
                Severity::High,
                format!("Adding {} strengthens the perimeter", node_type),
            ),
            PROTECTION_ADD_DELTA,
        );
        result.recommend(format!(
            "Route inbound traffic through the new {} and default-deny",
            node_type
        ));
    } else if AUTH_TYPES.contains(&node_type) {
        result.push(
            Impact::improvement(
                Security,
                Severity::Medium,
                format!("{} centralises identity and access control", node_type),
            ),
            10,
        );
        result.push(
            Impact::improvement(
                Compliance,
                Severity::Medium,
                "Satisfies access-control requirements in most frameworks",
            ),
            0,
        );
    } else if MONITORING_TYPES.contains(&node_type) {
        result.push(
            Impact::improvement(
                Compliance,
                Severity::Medium,
                format!("{} provides the audit trail frameworks require", node_type),
            ),
            10,
        );
        result.recommend("Forward logs from every tier to the new collector");
    } else if node_type == NodeType::Backup {
        result.push(
            Impact::improvement(
                Availability,
                Severity::High,
                "Backups allow recovery from data loss and ransomware",
            ),
            10,
        );
        result.recommend("Keep an off-site copy and test restores regularly");
    } else if node_type == NodeType::LoadBalancer {
        let description = if has(NodeType::LoadBalancer) {
            "An additional load balancer adds redundancy"
        } else {
            "Load balancing spreads traffic and removes a single point of failure"
        };
        result.push(
            Impact::improvement(Availability, Severity::Medium, description),
            10,
        );
    } else if node_type == NodeType::VpnGateway {
        result.push(
            Impact::improvement(
                Security,
                Severity::Medium,
                "Remote access is encrypted and authenticated",
            ),
            10,
        );
    } else if node_type == NodeType::DdosProtection || node_type == NodeType::Cdn {
        result.push(
            Impact::improvement(
                Availability,
                Severity::Medium,
                format!("{} absorbs volumetric attacks", node_type),
            ),
            10,
        );
    } else if node_type.is_data_store() {
        result.push(
            Impact::regression(
                Security,
                Severity::Medium,
                format!(
                    "A new {} is another asset holding data to protect",
                    node_type
                ),
            ),
            -5,
        );
        result.recommend(
            "Place the data store in the data tier and encrypt its connections",
        );
        if !has(NodeType::Backup) {
            result.recommend("Add a backup system for the new data store");
        }
    } else if PUBLIC_SERVICE_TYPES.contains(&node_type) && !has(NodeType::Waf) {
        result.push(
            Impact::regression(
                Security,
                Severity::Medium,
                format!(
                    "A public {} without a WAF widens the attack surface",
                    node_type
                ),
            ),
            -5,
        );
        result.recommend("Put a WAF in front of the new service");
    }

    let cost_severity = match node_type.category() {
        NodeCategory::Security | NodeCategory::Storage | NodeCategory::Compute => Severity::Low,
        _ => Severity::Info,
    };
    result.push(
        Impact::new(
            Cost,
            cost_severity,
            ImpactKind::Neutral,
            format!("Adds licensing and operating cost for one {}", node_type),
        ),
        0,
    );

    debug!("what-if add {}: delta {}", node_type, result.risk_delta);
    result
}

/// Predict the effect of removing the node with id `node_id`
///
/// An id that does not exist yields a result with no impacts and zero delta.
pub fn analyze_what_if_remove(spec: &InfraSpec, node_id: &str) -> WhatIfResult {
    use ImpactCategory::*;

    let Some(node) = spec.node(node_id) else {
        debug!("what-if remove: no node '{}'", node_id);
        return WhatIfResult::new(ChangeDescriptor::Remove {
            node_id: node_id.to_string(),
            node_type: None,
        });
    };
    let node_type = node.node_type.clone();
    let mut result = WhatIfResult::new(ChangeDescriptor::Remove {
        node_id: node_id.to_string(),
        node_type: Some(node_type.clone()),
    });
    let count = |t: &NodeType| spec.nodes.iter().filter(|n| &n.node_type == t).count();

    if node_type.is_protection() {
        result.push(
            Impact::regression(
                Security,
                Severity::High,
                format!("Removing {} leaves traffic uninspected", node.label),
            ),
            PROTECTION_REMOVE_DELTA,
        );
        if count(&node_type) == 1 {
            result.recommend(format!("Replace {} before decommissioning it", node.label));
        }
    } else if AUTH_TYPES.contains(&node_type) {
        result.push(
            Impact::regression(
                Security,
                Severity::High,
                format!("Removing {} weakens authentication", node.label),
            ),
            -20,
        );
        result.push(
            Impact::regression(
                Compliance,
                Severity::Medium,
                "Access-control requirements may no longer be met",
            ),
            0,
        );
    } else if MONITORING_TYPES.contains(&node_type) {
        result.push(
            Impact::regression(
                Compliance,
                Severity::Medium,
                format!("Removing {} loses the security audit trail", node.label),
            ),
            -15,
        );
    } else if node_type == NodeType::Backup {
        result.push(
            Impact::regression(
                Availability,
                Severity::High,
                "Data can no longer be restored after loss",
            ),
            -20,
        );
    } else if node_type == NodeType::LoadBalancer {
        if count(&NodeType::LoadBalancer) == 1 {
            result.push(
                Impact::regression(
                    Availability,
                    Severity::High,
                    format!(
                        "Removing the only load balancer makes {} a single point of failure",
                        backends_label(spec)
                    ),
                ),
                -20,
            );
            result.recommend(
                "Keep at least one load balancer, ideally an active/standby pair",
            );
        } else {
            result.push(
                Impact::regression(
                    Availability,
                    Severity::Medium,
                    "Load balancing capacity and redundancy drop",
                ),
                -5,
            );
        }
    } else if node_type.is_data_store() {
        result.push(
            Impact::regression(
                Availability,
                Severity::Medium,
                format!("Data held in {} must be migrated first", node.label),
            ),
            -10,
        );
    }

    let severed = spec
        .connections
        .iter()
        .filter(|c| c.source == node_id || c.target == node_id)
        .count();
    if severed > 0 {
        let severity = if severed >= 3 {
            Severity::High
        } else {
            Severity::Medium
        };
        result.push(
            Impact::regression(
                Availability,
                severity,
                format!("{} connection(s) would be broken", severed),
            ),
            SEVERED_EDGE_DELTA * severed as i32,
        );
        result.recommend("Reroute the affected connections before removing the node");
    }

    debug!("what-if remove {}: delta {}", node_id, result.risk_delta);
    result
}

fn backends_label(spec: &InfraSpec) -> &'static str {
    let backends = spec
        .nodes
        .iter()
        .filter(|n| PUBLIC_SERVICE_TYPES.contains(&n.node_type))
        .count();
    if backends > 1 {
        "the service tier"
    } else {
        "the service"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{FlowType, NodeSpec};

    fn lb_stack(lbs: usize) -> InfraSpec {
        let mut spec = InfraSpec::new()
            .with_node(NodeSpec::new("w1", NodeType::WebServer))
            .with_node(NodeSpec::new("w2", NodeType::WebServer));
        for i in 0..lbs {
            let id = format!("lb{i}");
            spec = spec
                .with_node(NodeSpec::new(&id, NodeType::LoadBalancer))
                .connect(&id, "w1", FlowType::Request)
                .connect(&id, "w2", FlowType::Request);
        }
        spec
    }

    #[test]
    fn test_add_protection_is_plus_15() {
        let spec = InfraSpec::new();
        for kind in [
            NodeType::Waf,
            NodeType::Firewall,
            NodeType::IdsIps,
            NodeType::Nac,
            NodeType::Dlp,
        ] {
            let result = analyze_what_if_add(&spec, kind.clone());
            assert_eq!(result.risk_delta, 15, "{}", kind);
            assert_eq!(result.impacts[0].category, ImpactCategory::Security);
            assert_eq!(result.impacts[0].kind, ImpactKind::Improvement);
        }
    }

    #[test]
    fn test_remove_protection_is_minus_25_without_edges() {
        let spec = InfraSpec::new().with_node(NodeSpec::new("fw", NodeType::Firewall));
        let result = analyze_what_if_remove(&spec, "fw");
        assert_eq!(result.risk_delta, -25);
    }

    #[test]
    fn test_remove_counts_severed_edges_once() {
        let spec = InfraSpec::new()
            .with_node(NodeSpec::new("fw", NodeType::Firewall))
            .with_node(NodeSpec::new("a", NodeType::Vm))
            .with_node(NodeSpec::new("b", NodeType::Vm))
            .connect("fw", "a", FlowType::Request)
            .connect("b", "fw", FlowType::Request)
            .connect("a", "b", FlowType::Request);
        let result = analyze_what_if_remove(&spec, "fw");
        let edge_impacts: Vec<_> = result
            .impacts
            .iter()
            .filter(|i| i.description.contains("connection(s)"))
            .collect();
        assert_eq!(edge_impacts.len(), 1);
        assert!(edge_impacts[0].description.starts_with("2 "));
        assert_eq!(edge_impacts[0].severity, Severity::Medium);
        assert_eq!(result.risk_delta, -25 - 6);
    }

    #[test]
    fn test_remove_only_load_balancer() {
        let spec = lb_stack(1);
        let result = analyze_what_if_remove(&spec, "lb0");
        assert!(result.impacts.iter().any(|i| {
            i.category == ImpactCategory::Availability
                && i.severity == Severity::High
                && i.description.contains("single point of failure")
        }));
        assert!(result.risk_delta < 0);
    }

    #[test]
    fn test_remove_one_of_two_load_balancers() {
        let spec = lb_stack(2);
        let result = analyze_what_if_remove(&spec, "lb1");
        assert!(!result
            .impacts
            .iter()
            .any(|i| i.description.contains("single point of failure")));
        assert_eq!(result.risk_delta, -5 - 6);
    }

    #[test]
    fn test_remove_missing_node_is_no_op() {
        let result = analyze_what_if_remove(&lb_stack(1), "ghost");
        assert!(result.is_no_op());
        assert!(result.recommendations.is_empty());
        assert_eq!(
            result.change,
            ChangeDescriptor::Remove {
                node_id: "ghost".into(),
                node_type: None
            }
        );
    }

    #[test]
    fn test_add_data_store_is_regression() {
        let result = analyze_what_if_add(&InfraSpec::new(), NodeType::DbServer);
        assert_eq!(result.risk_delta, -5);
        assert!(result.recommendations.iter().any(|r| r.contains("backup")));
    }

    #[test]
    fn test_add_always_reports_cost() {
        let result = analyze_what_if_add(&InfraSpec::new(), NodeType::Router);
        assert_eq!(result.risk_delta, 0);
        assert_eq!(result.impacts.len(), 1);
        assert_eq!(result.impacts[0].category, ImpactCategory::Cost);
    }

    #[test]
    fn test_result_json_shape() {
        let result = analyze_what_if_add(&InfraSpec::new(), NodeType::Waf);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["change"]["action"], "add");
        assert_eq!(json["change"]["nodeType"], "waf");
        assert_eq!(json["riskDelta"], 15);
    }
}
