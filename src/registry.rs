//! The node registry (§4.1): a process-wide, append-only catalog mapping
//! `nodeType -> NodeSpec`. Built once via [`NodeRegistry::with_builtins`]
//! and handed around by `Arc` reference (Design Notes §9: "expose it as a
//! constructed value"), never as global mutable state — grounded in the
//! teacher's declarative `GraphBuilder::add_node` registration style.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::node::Node;

/// The node's declaring package in the Python original (`model_nodes.py`,
/// `logic_nodes.py`, `memory_nodes.py`, `guard_nodes.py`, `task_nodes.py`);
/// carried as a registry field per SPEC_FULL §1 [EXPANDED].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Model,
    Logic,
    Memory,
    Guard,
    Task,
}

/// One configurable parameter on a node (§4.1).
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<serde_json::Value>,
    pub required: bool,
    pub group: Option<&'static str>,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Json,
    PromptTemplate,
    Select,
}

impl ParamDescriptor {
    #[must_use]
    pub fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            default: None,
            required: false,
            group: None,
            description,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Registry metadata for one node type (§4.1). The capability itself
/// (`Arc<dyn Node>`) is shared across every `NodeInstance` of this type.
#[derive(Clone)]
pub struct NodeSpec {
    pub node_type: &'static str,
    pub label: &'static str,
    pub category: NodeCategory,
    pub params: Vec<ParamDescriptor>,
    pub output_ports: Vec<&'static str>,
    pub capability: Arc<dyn Node>,
}

/// Process-wide catalog of node types. Lookup is O(1); registration
/// happens once at startup via [`NodeRegistry::with_builtins`] and the
/// registry is read-only (lock-free reads) afterward.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    specs: FxHashMap<&'static str, NodeSpec>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one node type. Append-only: a later call for the same
    /// `node_type` replaces the prior spec, matching the teacher's
    /// `GraphBuilder::add_node` semantics (last registration wins) rather
    /// than erroring on re-registration.
    pub fn register(&mut self, spec: NodeSpec) {
        self.specs.insert(spec.node_type, spec);
    }

    #[must_use]
    pub fn get(&self, node_type: &str) -> Option<&NodeSpec> {
        self.specs.get(node_type)
    }

    #[must_use]
    pub fn contains(&self, node_type: &str) -> bool {
        self.specs.contains_key(node_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeSpec> {
        self.specs.values()
    }

    /// Registers every built-in node from §4.3, grouped by category as in
    /// SPEC_FULL §4.3 [EXPANDED].
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }
}
