//! End-to-end scenarios over the public library API

use topoguard::audit::run_security_audit;
use topoguard::compliance::{check_compliance, ComplianceFramework};
use topoguard::diff::compute_spec_diff;
use topoguard::models::Severity;
use topoguard::scoring::security_score;
use topoguard::spec::{FlowType, InfraSpec, NodeSpec, NodeType, Tier};
use topoguard::whatif::{
    analyze_what_if_add, analyze_what_if_remove, ImpactCategory, ImpactKind,
};

fn exposed() -> InfraSpec {
    InfraSpec::new()
        .with_node(NodeSpec::new("inet", NodeType::Internet))
        .with_node(NodeSpec::in_tier("web", NodeType::WebServer, Tier::Dmz))
        .connect("inet", "web", FlowType::Request)
}

fn balanced() -> InfraSpec {
    InfraSpec::new()
        .with_node(NodeSpec::new("inet", NodeType::Internet))
        .with_node(NodeSpec::new("fw", NodeType::Firewall))
        .with_node(NodeSpec::new("lb", NodeType::LoadBalancer))
        .with_node(NodeSpec::new("web-1", NodeType::WebServer))
        .with_node(NodeSpec::new("web-2", NodeType::WebServer))
        .connect("inet", "fw", FlowType::Request)
        .connect("fw", "lb", FlowType::Request)
        .connect("lb", "web-1", FlowType::Request)
        .connect("lb", "web-2", FlowType::Request)
}

#[test]
fn test_missing_firewall_costs_25_points() {
    let result = run_security_audit(&exposed());
    let net001 = result
        .findings
        .iter()
        .find(|f| f.id == "NET-001")
        .expect("NET-001 fires on an exposed web server");
    assert_eq!(net001.severity, Severity::Critical);
    assert!(net001.affected_nodes.contains(&"inet".to_string()));

    let rest: Vec<_> = result
        .findings
        .iter()
        .filter(|f| f.id != "NET-001")
        .cloned()
        .collect();
    assert_eq!(security_score(&rest), result.score + 25);
    // Critical findings come first
    assert_eq!(result.findings[0].severity, Severity::Critical);
}

#[test]
fn test_adding_a_firewall_clears_net001() {
    let spec = exposed()
        .with_node(NodeSpec::new("fw", NodeType::Firewall))
        .connect("inet", "fw", FlowType::Request);
    let result = run_security_audit(&spec);
    assert!(!result.has_finding("NET-001"));
    assert!(result.score > run_security_audit(&exposed()).score);
}

#[test]
fn test_removing_only_load_balancer() {
    let result = analyze_what_if_remove(&balanced(), "lb");
    assert!(result.risk_delta < 0);
    assert!(result.impacts.iter().any(|i| {
        i.category == ImpactCategory::Availability
            && i.severity == Severity::High
            && i.kind == ImpactKind::Regression
    }));
    assert!(!result.recommendations.is_empty());
}

#[test]
fn test_removing_firewall_regresses_security() {
    let result = analyze_what_if_remove(&balanced(), "fw");
    assert!(result
        .impacts
        .iter()
        .any(|i| i.category == ImpactCategory::Security && i.kind == ImpactKind::Regression));
    // -25 for the firewall, -3 for each of its two connections
    assert_eq!(result.risk_delta, -31);
}

#[test]
fn test_adding_waf_improves_security() {
    let result = analyze_what_if_add(&exposed(), NodeType::Waf);
    assert_eq!(result.risk_delta, 15);
    assert!(result
        .impacts
        .iter()
        .any(|i| i.category == ImpactCategory::Cost));
}

#[test]
fn test_every_framework_reports_a_bounded_score() {
    for &framework in ComplianceFramework::all() {
        let report = check_compliance(&exposed(), framework);
        assert!(report.score <= 100, "{:?}", framework);
        assert_eq!(report.checks.len(), report.tally.total());
        assert_eq!(report.findings.len(), report.summary.total);
    }
}

#[test]
fn test_unknown_node_type_survives_a_round_trip() {
    let spec = InfraSpec::from_json(
        r#"{"nodes": [{"id": "q", "type": "quantum-router"}], "connections": []}"#,
    )
    .unwrap();
    assert_eq!(
        spec.nodes[0].node_type,
        NodeType::Unknown("quantum-router".to_string())
    );
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["nodes"][0]["type"], "quantum-router");
    assert_eq!(InfraSpec::from_json(&json.to_string()).unwrap(), spec);
    // Nothing in an unknown-only topology is actionable
    assert!(!run_security_audit(&spec).has_finding("NET-001"));
}

#[test]
fn test_diff_sees_a_change_between_two_unknown_types() {
    let before = InfraSpec::new().with_node(NodeSpec::new(
        "edge",
        NodeType::from_wire("quantum-router"),
    ));
    let after = InfraSpec::new().with_node(NodeSpec::new(
        "edge",
        NodeType::from_wire("edge-gateway"),
    ));
    let diff = compute_spec_diff(&before, &after);
    assert_eq!(diff.nodes_modified, 1);
    assert_eq!(diff.operations.len(), 1);
}
