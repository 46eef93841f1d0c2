//! The workflow definition (§3.2): an immutable, serializable snapshot of
//! node instances and edges that the compiler (§4.6) turns into a
//! [`crate::compiler::CompiledGraph`]. A `WorkflowDefinition` owns its
//! nodes and edges outright — no shared mutable references between
//! definitions, matching the teacher's preference for owned, serde-derived
//! config structs over reference graphs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Pseudo node type marking the graph's single entry point. Never
/// registered in the [`crate::registry::NodeRegistry`] — the compiler
/// resolves it structurally.
pub const START_NODE_TYPE: &str = "start";
/// Pseudo node type marking a graph exit. One or more may exist.
pub const END_NODE_TYPE: &str = "end";
/// The port an [`Edge`] uses when its author didn't pick one.
pub const DEFAULT_PORT: &str = "default";

/// Editor canvas coordinates. Opaque to the compiler and executor; carried
/// only so a round-tripped definition doesn't lose layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One placed node in the graph (§3.2). `node_type` is a key into the
/// [`crate::registry::NodeRegistry`] (or one of the two pseudo types);
/// `config` holds the user-bound parameter values the node's `execute`
/// reads at runtime — data only, never behavior (Design Notes §9).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: String,
    pub node_type: String,
    pub label: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub position: Position,
}

impl NodeInstance {
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            label: label.into(),
            config: Value::Object(serde_json::Map::new()),
            position: Position::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        self.node_type == START_NODE_TYPE
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.node_type == END_NODE_TYPE
    }

    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        self.is_start() || self.is_end()
    }
}

/// A control-flow arc (§3.2). `source_port` defaults to [`DEFAULT_PORT`]
/// when the author leaves it unset — most edges come off a node with only
/// one outgoing port.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default = "default_port_owned")]
    pub source_port: String,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_port_owned() -> String {
    DEFAULT_PORT.to_string()
}

impl Edge {
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_port: DEFAULT_PORT.to_string(),
            label: None,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.source_port = port.into();
        self
    }
}

/// A declarative, serializable workflow graph (§3.2). Immutable while a
/// session is executing it; a new version replaces it atomically via
/// [`WorkflowStore::save`](crate::workflow::store::WorkflowStore::save),
/// which re-touches `updated_at`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<NodeInstance>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub template_name: Option<String>,
}

impl WorkflowDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            created_at: now,
            updated_at: now,
            is_template: false,
            template_name: None,
        }
    }

    #[must_use]
    pub fn with_node(mut self, node: NodeInstance) -> Self {
        self.nodes.push(node);
        self
    }

    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Bumps `updated_at`. Ported from the Python original's
    /// `WorkflowDefinition.touch()` (SPEC_FULL §1 [EXPANDED]); called by
    /// the store on every save so readers can tell a stored copy is
    /// current without diffing its body.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn edges_from<'a>(&'a self, id: &str) -> Vec<&'a Edge> {
        self.edges.iter().filter(|e| e.source == id).collect()
    }

    #[must_use]
    pub fn start_node(&self) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.is_start())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_advances_updated_at() {
        let mut def = WorkflowDefinition::new("test");
        let before = def.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        def.touch();
        assert!(def.updated_at > before);
    }

    #[test]
    fn edges_from_filters_by_source() {
        let def = WorkflowDefinition::new("test")
            .with_edge(Edge::new("e1", "a", "b"))
            .with_edge(Edge::new("e2", "a", "c"))
            .with_edge(Edge::new("e3", "b", "c"));
        assert_eq!(def.edges_from("a").len(), 2);
        assert_eq!(def.edges_from("b").len(), 1);
        assert_eq!(def.edges_from("z").len(), 0);
    }
}
