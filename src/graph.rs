//! Mind-map graph types.
//!
//! A [`Graph`] is the validated form of what the model returned for one
//! chunk: a flat list of labelled nodes and a list of labelled, directed
//! edges between them. The serialised shape (`{"nodes": [...], "edges":
//! [...]}`) is exactly what graph renderers such as vis-network consume, so
//! [`Graph::to_json_pretty`] doubles as the export format.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Group assigned to nodes whose reply omitted `group`.
pub const DEFAULT_GROUP: &str = "default";

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

/// A concept in the mind map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub label: String,
    #[serde(default = "default_group", deserialize_with = "group_or_default")]
    pub group: String,
}

/// A directed, optionally labelled relation between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(deserialize_with = "string_or_number")]
    pub from: String,
    #[serde(deserialize_with = "string_or_number")]
    pub to: String,
    #[serde(default, deserialize_with = "label_or_empty")]
    pub label: String,
}

/// A mind map for one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Referential problems found by [`Graph::reference_issues`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIssues {
    /// Ids that appear on more than one node, in first-repeat order.
    pub duplicate_ids: Vec<String>,
    /// `(from, to)` of every edge with at least one unknown endpoint.
    pub dangling_edges: Vec<(String, String)>,
}

impl ReferenceIssues {
    pub fn is_empty(&self) -> bool {
        self.duplicate_ids.is_empty() && self.dangling_edges.is_empty()
    }
}

impl Graph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Look up a node by id (first match when ids repeat).
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Collect duplicate node ids and edges whose endpoints are unknown.
    pub fn reference_issues(&self) -> ReferenceIssues {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        let mut duplicate_ids = Vec::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) && !duplicate_ids.contains(&node.id) {
                duplicate_ids.push(node.id.clone());
            }
        }

        let dangling_edges = self
            .edges
            .iter()
            .filter(|e| !seen.contains(e.from.as_str()) || !seen.contains(e.to.as_str()))
            .map(|e| (e.from.clone(), e.to.clone()))
            .collect();

        ReferenceIssues {
            duplicate_ids,
            dangling_edges,
        }
    }

    /// Pretty-printed `{"nodes": [...], "edges": [...]}` for file export.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ── Lenient field decoding ───────────────────────────────────────────────────
//
// Models frequently emit numeric ids (`"id": 1`) and `null` for optional
// fields. Ids are stringified; `null` optional fields fall back to defaults.

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

fn group_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let group = Option::<String>::deserialize(deserializer)?;
    Ok(group
        .filter(|g| !g.trim().is_empty())
        .unwrap_or_else(default_group))
}

fn label_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
