//! Control evaluators shared across frameworks
//!
//! Frameworks phrase the same technical controls differently; each
//! evaluator here measures one control and every framework maps its own
//! numbered requirement onto it.

use crate::spec::{
    FlowType, NodeCategory, NodeSpec, NodeType, SpecContext, Tier, INSPECTION_TYPES,
    PUBLIC_SERVICE_TYPES,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of evaluating one compliance check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Partial,
    NotApplicable,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::Partial => "partial",
            CheckStatus::NotApplicable => "n/a",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub affected_nodes: Vec<String>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            affected_nodes: vec![],
        }
    }

    pub fn not_applicable() -> Self {
        Self {
            status: CheckStatus::NotApplicable,
            affected_nodes: vec![],
        }
    }

    pub fn fail(affected_nodes: Vec<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            affected_nodes,
        }
    }

    pub fn partial(affected_nodes: Vec<String>) -> Self {
        Self {
            status: CheckStatus::Partial,
            affected_nodes,
        }
    }
}

pub(crate) type Control = fn(&SpecContext<'_>) -> CheckOutcome;

fn ids(nodes: &[&NodeSpec]) -> Vec<String> {
    nodes.iter().map(|n| n.id.clone()).collect()
}

/// Pass when none of `flagged` out of `total`, partial when some, fail when all
fn proportion(total: usize, flagged: BTreeSet<String>, hits: usize) -> CheckOutcome {
    if hits == 0 {
        CheckOutcome::pass()
    } else if hits < total {
        CheckOutcome::partial(flagged.into_iter().collect())
    } else {
        CheckOutcome::fail(flagged.into_iter().collect())
    }
}

pub(crate) fn perimeter_firewall(ctx: &SpecContext<'_>) -> CheckOutcome {
    if !ctx.has_internet() {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Firewall) {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail(ctx.ids_matching(&[NodeType::Internet]))
    }
}

pub(crate) fn web_protection(ctx: &SpecContext<'_>) -> CheckOutcome {
    let web = ctx.nodes_matching(&[NodeType::WebServer, NodeType::ApiGateway]);
    if web.is_empty() || !ctx.has_internet() {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Waf) {
        CheckOutcome::pass()
    } else if ctx.has_type(NodeType::Firewall) {
        CheckOutcome::partial(ids(&web))
    } else {
        CheckOutcome::fail(ids(&web))
    }
}

pub(crate) fn segmentation(ctx: &SpecContext<'_>) -> CheckOutcome {
    let nodes = &ctx.spec().nodes;
    if nodes.len() < 3 {
        return CheckOutcome::not_applicable();
    }
    let unplaced: Vec<&NodeSpec> = nodes
        .iter()
        .filter(|n| n.tier.is_none() && n.zone.is_none())
        .collect();
    if unplaced.is_empty() {
        CheckOutcome::pass()
    } else if unplaced.len() < nodes.len() {
        CheckOutcome::partial(ids(&unplaced))
    } else {
        CheckOutcome::fail(vec![])
    }
}

fn protected_flow(flow: FlowType) -> bool {
    matches!(flow, FlowType::Encrypted | FlowType::Blocked)
}

pub(crate) fn data_encryption(ctx: &SpecContext<'_>) -> CheckOutcome {
    let mut total = 0;
    let mut hits = 0;
    let mut flagged = BTreeSet::new();
    for conn in ctx.connections() {
        let store_ends: Vec<&String> = [&conn.source, &conn.target]
            .into_iter()
            .filter(|id| ctx.endpoint_type(id).is_some_and(|t| t.is_data_store()))
            .collect();
        if store_ends.is_empty() {
            continue;
        }
        total += 1;
        if !protected_flow(conn.flow_type) {
            hits += 1;
            flagged.extend(store_ends.into_iter().cloned());
        }
    }
    if total == 0 {
        return CheckOutcome::not_applicable();
    }
    proportion(total, flagged, hits)
}

pub(crate) fn transit_encryption(ctx: &SpecContext<'_>) -> CheckOutcome {
    let mut total = 0;
    let mut hits = 0;
    let mut flagged = BTreeSet::new();
    for inet in ctx.nodes_of_type(NodeType::Internet) {
        for conn in ctx.connections_touching(&inet.id) {
            total += 1;
            if !protected_flow(conn.flow_type) {
                hits += 1;
                let other = if conn.source == inet.id {
                    &conn.target
                } else {
                    &conn.source
                };
                flagged.insert(other.clone());
            }
        }
    }
    if total == 0 {
        return CheckOutcome::not_applicable();
    }
    proportion(total, flagged, hits)
}

const IDENTITY_TYPES: &[NodeType] = &[NodeType::Sso, NodeType::Iam, NodeType::LdapAd];

fn has_principals(ctx: &SpecContext<'_>) -> bool {
    ctx.has_type(NodeType::User) || ctx.has_any(PUBLIC_SERVICE_TYPES)
}

pub(crate) fn access_control(ctx: &SpecContext<'_>) -> CheckOutcome {
    if !has_principals(ctx) {
        return CheckOutcome::not_applicable();
    }
    match (ctx.has_any(IDENTITY_TYPES), ctx.has_type(NodeType::Mfa)) {
        (true, true) => CheckOutcome::pass(),
        (true, false) => CheckOutcome::partial(ctx.ids_matching(IDENTITY_TYPES)),
        (false, _) => CheckOutcome::fail(ctx.ids_matching(&[NodeType::User])),
    }
}

pub(crate) fn multi_factor(ctx: &SpecContext<'_>) -> CheckOutcome {
    if !has_principals(ctx) {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Mfa) {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail(ctx.ids_matching(IDENTITY_TYPES))
    }
}

pub(crate) fn privileged_access(ctx: &SpecContext<'_>) -> CheckOutcome {
    let mut managed = ids(&ctx.nodes_in_category(NodeCategory::Compute));
    managed.extend(ids(&ctx.data_stores()));
    if managed.is_empty() {
        return CheckOutcome::not_applicable();
    }
    match (ctx.has_type(NodeType::Pam), ctx.has_type(NodeType::BastionHost)) {
        (true, _) => CheckOutcome::pass(),
        (false, true) => CheckOutcome::partial(vec![]),
        (false, false) => CheckOutcome::fail(managed),
    }
}

pub(crate) fn logging(ctx: &SpecContext<'_>) -> CheckOutcome {
    if ctx.node_count() == 0 {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Siem) {
        CheckOutcome::pass()
    } else if ctx.has_any(&[NodeType::Logging, NodeType::Monitoring]) {
        CheckOutcome::partial(vec![])
    } else {
        CheckOutcome::fail(vec![])
    }
}

pub(crate) fn intrusion_detection(ctx: &SpecContext<'_>) -> CheckOutcome {
    if !ctx.has_internet() {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::IdsIps) {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail(ctx.ids_matching(&[NodeType::Internet]))
    }
}

pub(crate) fn backup(ctx: &SpecContext<'_>) -> CheckOutcome {
    let stores = ctx.data_stores();
    if stores.is_empty() {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Backup) {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail(ids(&stores))
    }
}

pub(crate) fn data_loss_prevention(ctx: &SpecContext<'_>) -> CheckOutcome {
    let stores = ctx.data_stores();
    if stores.is_empty() {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Dlp) {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail(ids(&stores))
    }
}

pub(crate) fn key_management(ctx: &SpecContext<'_>) -> CheckOutcome {
    let stores = ctx.data_stores();
    if stores.is_empty() {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Kms) {
        return CheckOutcome::pass();
    }
    // Encrypted links without managed keys count for half
    match data_encryption(ctx).status {
        CheckStatus::Pass => CheckOutcome::partial(vec![]),
        _ => CheckOutcome::fail(ids(&stores)),
    }
}

pub(crate) fn data_isolation(ctx: &SpecContext<'_>) -> CheckOutcome {
    let stores = ctx.data_stores();
    if stores.is_empty() {
        return CheckOutcome::not_applicable();
    }
    let exposed: Vec<String> = ctx
        .exposed_nodes(INSPECTION_TYPES)
        .into_iter()
        .filter(|n| n.node_type.is_data_store())
        .map(|n| n.id.clone())
        .collect();
    if !exposed.is_empty() {
        return CheckOutcome::fail(exposed);
    }
    let misplaced: Vec<String> = stores
        .iter()
        .filter(|n| !matches!(n.tier, Some(Tier::Internal) | Some(Tier::Data)))
        .map(|n| n.id.clone())
        .collect();
    if misplaced.is_empty() {
        CheckOutcome::pass()
    } else {
        CheckOutcome::partial(misplaced)
    }
}

pub(crate) fn availability(ctx: &SpecContext<'_>) -> CheckOutcome {
    let public = ctx.nodes_matching(PUBLIC_SERVICE_TYPES);
    if public.is_empty() {
        return CheckOutcome::not_applicable();
    }
    match ctx.count(NodeType::LoadBalancer) {
        0 => CheckOutcome::fail(ids(&public)),
        1 => CheckOutcome::partial(ctx.ids_matching(&[NodeType::LoadBalancer])),
        _ => CheckOutcome::pass(),
    }
}

pub(crate) fn endpoint_control(ctx: &SpecContext<'_>) -> CheckOutcome {
    let endpoints = ctx.nodes_in_category(NodeCategory::Endpoint);
    if endpoints.is_empty() {
        return CheckOutcome::not_applicable();
    }
    if ctx.has_type(NodeType::Nac) {
        CheckOutcome::pass()
    } else {
        CheckOutcome::fail(ids(&endpoints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::InfraSpec;

    fn eval(control: Control, spec: &InfraSpec) -> CheckOutcome {
        control(&SpecContext::new(spec))
    }

    #[test]
    fn test_not_applicable_on_empty_spec() {
        let spec = InfraSpec::new();
        for control in [
            perimeter_firewall,
            web_protection,
            segmentation,
            data_encryption,
            transit_encryption,
            access_control,
            multi_factor,
            privileged_access,
            logging,
            intrusion_detection,
            backup,
            data_loss_prevention,
            key_management,
            data_isolation,
            availability,
            endpoint_control,
        ] {
            assert_eq!(eval(control, &spec).status, CheckStatus::NotApplicable);
        }
    }

    #[test]
    fn test_data_encryption_partial() {
        let spec = InfraSpec::new()
            .with_node(NodeSpec::new("app", NodeType::AppServer))
            .with_node(NodeSpec::new("db", NodeType::DbServer))
            .with_node(NodeSpec::new("cache", NodeType::Cache))
            .connect("app", "db", FlowType::Encrypted)
            .connect("app", "cache", FlowType::Request);
        let outcome = eval(data_encryption, &spec);
        assert_eq!(outcome.status, CheckStatus::Partial);
        assert_eq!(outcome.affected_nodes, vec!["cache"]);
    }

    #[test]
    fn test_access_control_tiers() {
        let users = InfraSpec::new().with_node(NodeSpec::new("u", NodeType::User));
        assert_eq!(eval(access_control, &users).status, CheckStatus::Fail);
        let idp = users.with_node(NodeSpec::new("iam", NodeType::Iam));
        assert_eq!(eval(access_control, &idp).status, CheckStatus::Partial);
        let mfa = idp.with_node(NodeSpec::new("mfa", NodeType::Mfa));
        assert_eq!(eval(access_control, &mfa).status, CheckStatus::Pass);
    }

    #[test]
    fn test_data_isolation_exposed_store_fails() {
        let spec = InfraSpec::new()
            .with_node(NodeSpec::new("inet", NodeType::Internet))
            .with_node(NodeSpec::in_tier("db", NodeType::DbServer, Tier::Data))
            .connect("inet", "db", FlowType::Request);
        let outcome = eval(data_isolation, &spec);
        assert_eq!(outcome.status, CheckStatus::Fail);
        assert_eq!(outcome.affected_nodes, vec!["db"]);
    }

    #[test]
    fn test_availability_by_load_balancer_count() {
        let spec = InfraSpec::new().with_node(NodeSpec::new("w", NodeType::WebServer));
        assert_eq!(eval(availability, &spec).status, CheckStatus::Fail);
        let one = spec.with_node(NodeSpec::new("lb1", NodeType::LoadBalancer));
        assert_eq!(eval(availability, &one).status, CheckStatus::Partial);
        let two = one.with_node(NodeSpec::new("lb2", NodeType::LoadBalancer));
        assert_eq!(eval(availability, &two).status, CheckStatus::Pass);
    }
}
