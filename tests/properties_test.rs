//! Property tests for the pure engines: diff, scoring and calibration

use proptest::prelude::*;
use topoguard::calibrate::{
    compute_calibration_data, CalibratedSeverity, CalibrationConfig, SeverityCatalog,
};
use topoguard::diff::compute_spec_diff;
use topoguard::models::{Finding, FindingCategory, Severity};
use topoguard::scoring::security_score;
use topoguard::spec::{ConnectionSpec, FlowType, InfraSpec, NodeSpec, NodeType, Tier};
use topoguard::store::{AntiPatternInteraction, InteractionAction};

const TYPES: &[NodeType] = &[
    NodeType::Internet,
    NodeType::Firewall,
    NodeType::Waf,
    NodeType::WebServer,
    NodeType::AppServer,
    NodeType::DbServer,
    NodeType::LoadBalancer,
];

const TIERS: &[Option<Tier>] = &[None, Some(Tier::External), Some(Tier::Dmz)];

const SEVERITIES: &[Severity] = &[
    Severity::Info,
    Severity::Low,
    Severity::Medium,
    Severity::High,
    Severity::Critical,
];

/// Specs with unique node ids drawn from a small pool so two generated specs
/// overlap often
fn arb_spec() -> impl Strategy<Value = InfraSpec> {
    let nodes = prop::collection::btree_map(
        0usize..8,
        (0..TYPES.len(), 0..TIERS.len()),
        0..6,
    );
    let edges = prop::collection::btree_set((0usize..8, 0usize..8), 0..6);
    (nodes, edges).prop_map(|(nodes, edges)| {
        let mut spec = InfraSpec::new();
        for (i, (t, tier)) in &nodes {
            let mut node = NodeSpec::new(&format!("n{i}"), TYPES[*t].clone());
            node.tier = TIERS[*tier];
            spec = spec.with_node(node);
        }
        for (s, t) in edges {
            if s != t && nodes.contains_key(&s) && nodes.contains_key(&t) {
                spec = spec.with_connection(ConnectionSpec::new(
                    &format!("n{s}"),
                    &format!("n{t}"),
                    FlowType::Request,
                ));
            }
        }
        spec
    })
}

fn finding(severity: Severity) -> Finding {
    Finding {
        id: "X-001".to_string(),
        title: "x".to_string(),
        description: String::new(),
        severity,
        category: FindingCategory::Network,
        affected_nodes: Vec::new(),
        recommendation: String::new(),
        references: Vec::new(),
    }
}

/// A spec paired with a copy whose nodes and connections are permuted
fn arb_spec_and_permutation() -> impl Strategy<Value = (InfraSpec, InfraSpec)> {
    arb_spec().prop_flat_map(|spec| {
        let nodes = Just(spec.nodes.clone()).prop_shuffle();
        let connections = Just(spec.connections.clone()).prop_shuffle();
        (Just(spec), nodes, connections).prop_map(|(spec, nodes, connections)| {
            let permuted = InfraSpec {
                nodes,
                connections,
            };
            (spec, permuted)
        })
    })
}

fn arb_action() -> impl Strategy<Value = InteractionAction> {
    prop_oneof![
        Just(InteractionAction::Shown),
        Just(InteractionAction::Ignored),
        Just(InteractionAction::Fixed),
    ]
}

proptest! {
    #[test]
    fn prop_diff_with_self_is_empty(spec in arb_spec()) {
        let diff = compute_spec_diff(&spec, &spec);
        prop_assert!(diff.is_empty());
        prop_assert!(diff.placement_changes.is_empty());
    }

    #[test]
    fn prop_diff_ignores_declaration_order(
        (a, a_permuted) in arb_spec_and_permutation(),
        (b, b_permuted) in arb_spec_and_permutation(),
    ) {
        let forward = compute_spec_diff(&a, &b);
        let shuffled = compute_spec_diff(&a_permuted, &b_permuted);
        prop_assert_eq!(forward, shuffled);
    }

    #[test]
    fn prop_diff_counts_match_operations(a in arb_spec(), b in arb_spec()) {
        let diff = compute_spec_diff(&a, &b);
        let changes = diff.nodes_added
            + diff.nodes_removed
            + diff.nodes_modified
            + diff.connections_added
            + diff.connections_removed
            + diff.connections_modified;
        prop_assert_eq!(changes == 0, diff.operations.is_empty());
        prop_assert_eq!(
            diff.nodes_added as isize - diff.nodes_removed as isize,
            b.nodes.len() as isize - a.nodes.len() as isize
        );
    }

    #[test]
    fn prop_score_bounded_and_monotone(
        picks in prop::collection::vec(0..SEVERITIES.len(), 0..12),
        extra in 0..SEVERITIES.len(),
    ) {
        let mut findings: Vec<Finding> =
            picks.iter().map(|&i| finding(SEVERITIES[i])).collect();
        let before = security_score(&findings);
        prop_assert!(before <= 100);
        findings.push(finding(SEVERITIES[extra]));
        prop_assert!(security_score(&findings) <= before);
    }

    #[test]
    fn prop_calibration_rates_within_bounds(
        actions in prop::collection::vec((0usize..3, arb_action()), 0..40),
    ) {
        let ids = ["NET-001", "NET-002", "MON-001"];
        let interactions: Vec<AntiPatternInteraction> = actions
            .iter()
            .map(|(i, action)| AntiPatternInteraction::new(ids[*i], *action, "prop"))
            .collect();
        let catalog = SeverityCatalog::builtin();
        let calibrations =
            compute_calibration_data(&interactions, &catalog, &CalibrationConfig::default());

        for calibration in calibrations.values() {
            prop_assert!((0.0..=1.0).contains(&calibration.ignore_rate));
            prop_assert!((0.0..=1.0).contains(&calibration.fix_rate));
            prop_assert!(
                calibration.ignored_count + calibration.fixed_count <= calibration.total_shown
            );
            let ceiling = CalibratedSeverity::from(calibration.original_severity);
            prop_assert!(calibration.calibrated_severity <= ceiling);
            if calibration.original_severity == Severity::Critical {
                prop_assert!(calibration.calibrated_severity >= CalibratedSeverity::High);
            }
        }
    }
}
