//! Read-only index over an `InfraSpec`, built once per evaluation
//!
//! Rules query the context instead of re-scanning the raw node and
//! connection lists. Connections whose endpoints do not exist are kept in
//! the raw list but left out of the graph view, so reachability queries
//! never see dangling edges.

use super::{ConnectionSpec, FlowType, InfraSpec, NodeCategory, NodeSpec, NodeType};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

pub struct SpecContext<'a> {
    spec: &'a InfraSpec,
    by_id: FxHashMap<&'a str, &'a NodeSpec>,
    by_type: FxHashMap<NodeType, Vec<&'a NodeSpec>>,
    graph: DiGraph<&'a NodeSpec, FlowType>,
    index: FxHashMap<&'a str, NodeIndex>,
}

impl<'a> SpecContext<'a> {
    pub fn new(spec: &'a InfraSpec) -> Self {
        let mut by_id = FxHashMap::default();
        let mut by_type: FxHashMap<NodeType, Vec<&'a NodeSpec>> = FxHashMap::default();
        let mut graph = DiGraph::new();
        let mut index = FxHashMap::default();

        for node in &spec.nodes {
            // First definition of a duplicated id wins
            if by_id.contains_key(node.id.as_str()) {
                continue;
            }
            by_id.insert(node.id.as_str(), node);
            by_type.entry(node.node_type.clone()).or_default().push(node);
            index.insert(node.id.as_str(), graph.add_node(node));
        }

        for conn in &spec.connections {
            if let (Some(&src), Some(&dst)) =
                (index.get(conn.source.as_str()), index.get(conn.target.as_str()))
            {
                graph.add_edge(src, dst, conn.flow_type);
            }
        }

        Self {
            spec,
            by_id,
            by_type,
            graph,
            index,
        }
    }

    pub fn spec(&self) -> &'a InfraSpec {
        self.spec
    }

    pub fn node(&self, id: &str) -> Option<&'a NodeSpec> {
        self.by_id.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.spec.nodes.len()
    }

    pub fn has_type(&self, node_type: NodeType) -> bool {
        self.by_type.contains_key(&node_type)
    }

    pub fn has_any(&self, types: &[NodeType]) -> bool {
        types.iter().any(|t| self.by_type.contains_key(t))
    }

    pub fn count(&self, node_type: NodeType) -> usize {
        self.by_type.get(&node_type).map_or(0, |v| v.len())
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> &[&'a NodeSpec] {
        self.by_type
            .get(&node_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes of any of the given kinds, in spec order
    pub fn nodes_matching(&self, types: &[NodeType]) -> Vec<&'a NodeSpec> {
        self.unique_nodes()
            .filter(|n| types.contains(&n.node_type))
            .collect()
    }

    pub fn nodes_in_category(&self, category: NodeCategory) -> Vec<&'a NodeSpec> {
        self.unique_nodes()
            .filter(|n| n.node_type.category() == category)
            .collect()
    }

    pub fn ids_matching(&self, types: &[NodeType]) -> Vec<String> {
        self.nodes_matching(types)
            .into_iter()
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn data_stores(&self) -> Vec<&'a NodeSpec> {
        self.unique_nodes()
            .filter(|n| n.node_type.is_data_store())
            .collect()
    }

    /// Whether the topology is exposed to the outside world at all
    pub fn has_internet(&self) -> bool {
        self.has_type(NodeType::Internet)
    }

    pub fn connections(&self) -> &'a [ConnectionSpec] {
        &self.spec.connections
    }

    /// Connections whose source or target is `id` (dangling ones included)
    pub fn connections_touching<'s>(
        &'s self,
        id: &'s str,
    ) -> impl Iterator<Item = &'a ConnectionSpec> + 's {
        self.spec
            .connections
            .iter()
            .filter(move |c| c.source == id || c.target == id)
    }

    /// Type of the node at either end of a connection, if it exists
    pub fn endpoint_type(&self, id: &str) -> Option<NodeType> {
        self.node(id).map(|n| n.node_type.clone())
    }

    /// Nodes reachable from any internet node without passing through an
    /// inspection hop or a blocked flow. Edges are walked in both
    /// directions: diagrams are not consistent about arrow direction.
    pub fn exposed_nodes(&self, inspection: &[NodeType]) -> Vec<&'a NodeSpec> {
        let mut visited: FxHashSet<NodeIndex> = FxHashSet::default();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();

        for node in self.nodes_of_type(NodeType::Internet) {
            if let Some(&idx) = self.index.get(node.id.as_str()) {
                visited.insert(idx);
                queue.push_back(idx);
            }
        }

        while let Some(current) = queue.pop_front() {
            let edges = self
                .graph
                .edges_directed(current, Direction::Outgoing)
                .map(|e| (e.target(), *e.weight()))
                .chain(
                    self.graph
                        .edges_directed(current, Direction::Incoming)
                        .map(|e| (e.source(), *e.weight())),
                );

            for (next, flow) in edges {
                if flow == FlowType::Blocked || visited.contains(&next) {
                    continue;
                }
                visited.insert(next);
                if inspection.contains(&self.graph[next].node_type) {
                    continue;
                }
                queue.push_back(next);
            }
        }

        let mut exposed: Vec<&'a NodeSpec> = visited
            .into_iter()
            .map(|idx| self.graph[idx])
            .filter(|n| n.node_type != NodeType::Internet && !inspection.contains(&n.node_type))
            .collect();
        exposed.sort_by(|a, b| a.id.cmp(&b.id));
        exposed
    }

    /// Each node exactly once, spec order, first definition of an id wins
    fn unique_nodes(&self) -> impl Iterator<Item = &'a NodeSpec> + '_ {
        self.spec.nodes.iter().filter(move |n| {
            self.by_id
                .get(n.id.as_str())
                .is_some_and(|first| std::ptr::eq(*first, *n))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{INSPECTION_TYPES, NodeSpec};

    fn web_stack(with_firewall: bool) -> InfraSpec {
        let mut spec = InfraSpec::new()
            .with_node(NodeSpec::new("inet", NodeType::Internet))
            .with_node(NodeSpec::new("web", NodeType::WebServer))
            .with_node(NodeSpec::new("db", NodeType::DbServer));
        if with_firewall {
            spec = spec
                .with_node(NodeSpec::new("fw", NodeType::Firewall))
                .connect("inet", "fw", FlowType::Request)
                .connect("fw", "web", FlowType::Request);
        } else {
            spec = spec.connect("inet", "web", FlowType::Request);
        }
        spec.connect("web", "db", FlowType::Request)
    }

    #[test]
    fn test_lookup_by_type() {
        let spec = web_stack(true);
        let ctx = SpecContext::new(&spec);
        assert!(ctx.has_type(NodeType::Firewall));
        assert_eq!(ctx.count(NodeType::WebServer), 1);
        assert_eq!(ctx.data_stores().len(), 1);
        assert!(ctx.node("missing").is_none());
    }

    #[test]
    fn test_exposed_without_firewall() {
        let spec = web_stack(false);
        let ctx = SpecContext::new(&spec);
        let exposed: Vec<_> = ctx
            .exposed_nodes(INSPECTION_TYPES)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(exposed, vec!["db", "web"]);
    }

    #[test]
    fn test_firewall_stops_exposure() {
        let spec = web_stack(true);
        let ctx = SpecContext::new(&spec);
        assert!(ctx.exposed_nodes(INSPECTION_TYPES).is_empty());
    }

    #[test]
    fn test_blocked_flow_stops_exposure() {
        let spec = InfraSpec::new()
            .with_node(NodeSpec::new("inet", NodeType::Internet))
            .with_node(NodeSpec::new("db", NodeType::DbServer))
            .connect("inet", "db", FlowType::Blocked);
        let ctx = SpecContext::new(&spec);
        assert!(ctx.exposed_nodes(INSPECTION_TYPES).is_empty());
    }

    #[test]
    fn test_dangling_connections_tolerated() {
        let spec = InfraSpec::new()
            .with_node(NodeSpec::new("inet", NodeType::Internet))
            .connect("inet", "ghost", FlowType::Request)
            .connect("phantom", "inet", FlowType::Request);
        let ctx = SpecContext::new(&spec);
        assert!(ctx.exposed_nodes(INSPECTION_TYPES).is_empty());
        assert_eq!(ctx.connections_touching("inet").count(), 2);
        assert_eq!(ctx.endpoint_type("ghost"), None);
    }

    #[test]
    fn test_duplicate_ids_first_wins() {
        let spec = InfraSpec::new()
            .with_node(NodeSpec::new("a", NodeType::Firewall))
            .with_node(NodeSpec::new("a", NodeType::Waf));
        let ctx = SpecContext::new(&spec);
        assert_eq!(ctx.node("a").unwrap().node_type, NodeType::Firewall);
        assert!(!ctx.has_type(NodeType::Waf));
        assert_eq!(
            ctx.nodes_matching(&[NodeType::Firewall, NodeType::Waf]).len(),
            1
        );
    }
}
