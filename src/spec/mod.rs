//! Infrastructure topology model
//!
//! An `InfraSpec` is the immutable input every other component consumes:
//! a list of nodes and a list of typed, directed connections between them.
//! Producers (diagram editor, prompt parser, templates) are responsible for
//! referential integrity; nothing here rejects a connection whose endpoint
//! does not exist.

mod context;
mod node_type;

pub use context::SpecContext;
pub use node_type::{
    NodeCategory, NodeType, DATA_STORE_TYPES, INSPECTION_TYPES, PROTECTION_TYPES,
    PUBLIC_SERVICE_TYPES,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Network placement tier of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    External,
    Dmz,
    Internal,
    Data,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::External => "external",
            Tier::Dmz => "dmz",
            Tier::Internal => "internal",
            Tier::Data => "data",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of traffic a connection carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    #[default]
    Request,
    Response,
    Sync,
    Blocked,
    Encrypted,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::Request => "request",
            FlowType::Response => "response",
            FlowType::Sync => "sync",
            FlowType::Blocked => "blocked",
            FlowType::Encrypted => "encrypted",
        }
    }
}

/// A node in the topology
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeSpec {
    pub fn new(id: &str, node_type: NodeType) -> Self {
        Self {
            id: id.to_string(),
            node_type,
            label: id.to_string(),
            tier: None,
            zone: None,
            description: None,
        }
    }

    /// `new` plus `with_tier`
    pub fn in_tier(id: &str, node_type: NodeType, tier: Tier) -> Self {
        Self::new(id, node_type).with_tier(tier)
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn with_zone(mut self, zone: &str) -> Self {
        self.zone = Some(zone.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub flow_type: FlowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ConnectionSpec {
    pub fn new(source: &str, target: &str, flow_type: FlowType) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            flow_type,
            label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Identity used by the differ: direction matters
    pub fn key(&self) -> String {
        format!("{}→{}", self.source, self.target)
    }
}

/// The topology under analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraSpec {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

/// Errors loading a spec from disk or text
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read spec {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid spec JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl InfraSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_connection(mut self, connection: ConnectionSpec) -> Self {
        self.connections.push(connection);
        self
    }

    /// Shorthand used heavily by tests: `connect("a", "b", FlowType::Request)`
    pub fn connect(self, source: &str, target: &str, flow_type: FlowType) -> Self {
        self.with_connection(ConnectionSpec::new(source, target, flow_type))
    }

    pub fn from_json(text: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let text = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    /// Distinct node kinds present, in first-seen order
    pub fn node_types(&self) -> Vec<NodeType> {
        let mut seen = Vec::new();
        for node in &self.nodes {
            if !seen.contains(&node.node_type) {
                seen.push(node.node_type.clone());
            }
        }
        seen
    }
}
