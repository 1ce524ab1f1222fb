//! Structural diff of two topologies
//!
//! Used to work out what a user changed in a generated diagram. Nodes are
//! matched by id and connections by `source→target`, so a reversed edge is
//! a remove plus an add. The result does not depend on the order of nodes
//! or connections in either input.

use crate::spec::{ConnectionSpec, InfraSpec, NodeSpec, NodeType, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeField {
    Type,
    Label,
    Tier,
    Zone,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionField {
    FlowType,
    Label,
}

/// One structural edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DiffOperation {
    AddNode {
        node: NodeSpec,
    },
    RemoveNode {
        node: NodeSpec,
    },
    #[serde(rename_all = "camelCase")]
    ModifyNode {
        node_id: String,
        field: NodeField,
        old_value: Option<String>,
        new_value: Option<String>,
    },
    AddConnection {
        connection: ConnectionSpec,
    },
    RemoveConnection {
        connection: ConnectionSpec,
    },
    #[serde(rename_all = "camelCase")]
    ModifyConnection {
        key: String,
        field: ConnectionField,
        old_value: Option<String>,
        new_value: Option<String>,
    },
}

/// A node that changed tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementChange {
    pub node_id: String,
    pub node_type: NodeType,
    pub from_tier: Option<Tier>,
    pub to_tier: Option<Tier>,
    /// Both tiers were set, so the node moved rather than being placed or
    /// unplaced
    pub moved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDiff {
    pub operations: Vec<DiffOperation>,
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub nodes_modified: usize,
    pub connections_added: usize,
    pub connections_removed: usize,
    pub connections_modified: usize,
    pub placement_changes: Vec<PlacementChange>,
}

impl SpecDiff {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Ids of nodes added, removed or modified
    pub fn touched_node_ids(&self) -> BTreeSet<String> {
        self.operations
            .iter()
            .filter_map(|op| match op {
                DiffOperation::AddNode { node } | DiffOperation::RemoveNode { node } => {
                    Some(node.id.clone())
                }
                DiffOperation::ModifyNode { node_id, .. } => Some(node_id.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Group items by key, each group sorted so duplicates pair up the same way
/// regardless of input order
fn grouped<'a, T: Ord>(
    items: &'a [T],
    key: impl Fn(&T) -> String,
) -> BTreeMap<String, Vec<&'a T>> {
    let mut groups: BTreeMap<String, Vec<&T>> = BTreeMap::new();
    for item in items {
        groups.entry(key(item)).or_default().push(item);
    }
    for group in groups.values_mut() {
        group.sort();
    }
    groups
}

fn node_field_ops(old: &NodeSpec, new: &NodeSpec) -> Vec<DiffOperation> {
    let fields: [(NodeField, Option<String>, Option<String>); 5] = [
        (
            NodeField::Type,
            Some(old.node_type.as_str().to_string()),
            Some(new.node_type.as_str().to_string()),
        ),
        (
            NodeField::Label,
            Some(old.label.clone()),
            Some(new.label.clone()),
        ),
        (
            NodeField::Tier,
            old.tier.map(|t| t.as_str().to_string()),
            new.tier.map(|t| t.as_str().to_string()),
        ),
        (NodeField::Zone, old.zone.clone(), new.zone.clone()),
        (
            NodeField::Description,
            old.description.clone(),
            new.description.clone(),
        ),
    ];
    fields
        .into_iter()
        .filter(|(_, a, b)| a != b)
        .map(|(field, old_value, new_value)| DiffOperation::ModifyNode {
            node_id: old.id.clone(),
            field,
            old_value,
            new_value,
        })
        .collect()
}

fn connection_field_ops(
    key: &str,
    old: &ConnectionSpec,
    new: &ConnectionSpec,
) -> Vec<DiffOperation> {
    let mut ops = Vec::new();
    if old.flow_type != new.flow_type {
        ops.push(DiffOperation::ModifyConnection {
            key: key.to_string(),
            field: ConnectionField::FlowType,
            old_value: Some(old.flow_type.as_str().to_string()),
            new_value: Some(new.flow_type.as_str().to_string()),
        });
    }
    if old.label != new.label {
        ops.push(DiffOperation::ModifyConnection {
            key: key.to_string(),
            field: ConnectionField::Label,
            old_value: old.label.clone(),
            new_value: new.label.clone(),
        });
    }
    ops
}

/// Compute the structural diff from `original` to `modified`
pub fn compute_spec_diff(original: &InfraSpec, modified: &InfraSpec) -> SpecDiff {
    let mut diff = SpecDiff::default();

    let old_nodes = grouped(&original.nodes, |n| n.id.clone());
    let new_nodes = grouped(&modified.nodes, |n| n.id.clone());
    let node_ids: BTreeSet<&String> = old_nodes.keys().chain(new_nodes.keys()).collect();

    for id in node_ids {
        let olds = old_nodes.get(id).map(Vec::as_slice).unwrap_or(&[]);
        let news = new_nodes.get(id).map(Vec::as_slice).unwrap_or(&[]);

        for (old, new) in olds.iter().zip(news.iter()) {
            let ops = node_field_ops(old, new);
            if ops.is_empty() {
                continue;
            }
            diff.nodes_modified += 1;
            diff.operations.extend(ops);
            if old.tier != new.tier {
                diff.placement_changes.push(PlacementChange {
                    node_id: id.clone(),
                    node_type: new.node_type.clone(),
                    from_tier: old.tier,
                    to_tier: new.tier,
                    moved: old.tier.is_some() && new.tier.is_some(),
                });
            }
        }
        for old in olds.iter().skip(news.len()) {
            diff.nodes_removed += 1;
            diff.operations.push(DiffOperation::RemoveNode {
                node: (*old).clone(),
            });
        }
        for new in news.iter().skip(olds.len()) {
            diff.nodes_added += 1;
            diff.operations.push(DiffOperation::AddNode {
                node: (*new).clone(),
            });
        }
    }

    let old_conns = grouped(&original.connections, ConnectionSpec::key);
    let new_conns = grouped(&modified.connections, ConnectionSpec::key);
    let conn_keys: BTreeSet<&String> = old_conns.keys().chain(new_conns.keys()).collect();

    for key in conn_keys {
        let olds = old_conns.get(key).map(Vec::as_slice).unwrap_or(&[]);
        let news = new_conns.get(key).map(Vec::as_slice).unwrap_or(&[]);

        for (old, new) in olds.iter().zip(news.iter()) {
            let ops = connection_field_ops(key, old, new);
            if !ops.is_empty() {
                diff.connections_modified += 1;
                diff.operations.extend(ops);
            }
        }
        for old in olds.iter().skip(news.len()) {
            diff.connections_removed += 1;
            diff.operations.push(DiffOperation::RemoveConnection {
                connection: (*old).clone(),
            });
        }
        for new in news.iter().skip(olds.len()) {
            diff.connections_added += 1;
            diff.operations.push(DiffOperation::AddConnection {
                connection: (*new).clone(),
            });
        }
    }

    debug!(
        "spec diff: {} operations ({} placement changes)",
        diff.operations.len(),
        diff.placement_changes.len()
    );
    diff
}
