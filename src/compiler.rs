//! The compiler (§4.6): transforms a validated [`WorkflowDefinition`] into
//! a [`CompiledGraph`] — an adjacency-and-callable structure, no code
//! generation or expression compilation (§9 "Cyclic graphs": "store the
//! graph as an adjacency list keyed by nodeId"). Grounded in the teacher's
//! `graphs/compilation.rs` (a thin `impl` converting a builder into an
//! executable `App`) and `graphs/builder.rs`'s edge-grouping logic,
//! generalized from the teacher's static node-kind edges to this spec's
//! per-node dynamic routing functions.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::node::{Node, RoutingFn};
use crate::registry::NodeRegistry;
use crate::workflow::model::{WorkflowDefinition, END_NODE_TYPE};
use crate::workflow::validate;

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("workflow failed validation: {0:?}")]
    #[diagnostic(code(flowgraph::compiler::invalid))]
    Invalid(Vec<String>),

    #[error("node {node_id} has unknown node type {node_type}")]
    #[diagnostic(
        code(flowgraph::compiler::unknown_node_type),
        help("Register {node_type} with NodeRegistry::register before compiling, or fix the node's nodeType.")
    )]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("start node {0} has more than one distinct outgoing target; the executor needs a single entry point")]
    #[diagnostic(code(flowgraph::compiler::ambiguous_entry))]
    AmbiguousEntry(String),
}

/// Where an edge or routing decision leads: either a concrete node, or the
/// graph's terminal sentinel (§4.6 step 4: "resolve any `end` pseudo-targets
/// to the graph's terminal sentinel").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    Node(String),
    End,
}

/// One non-pseudo node instance, bound to its concrete capability and
/// config (§4.6 step 2). The "wrapped execution function" of §4.6 step 2
/// (enter/exit/error logging) is implemented by [`crate::executor::Executor`]
/// around this struct rather than as a literal closure stored here — Rust's
/// lifetime rules make a `Fn` wrapper that borrows `state`/`ctx` per call
/// awkward to store as a trait object; calling the capability directly and
/// wrapping the *call site* is equivalent and simpler.
#[derive(Clone)]
pub struct CompiledNode {
    pub id: String,
    pub label: String,
    pub node_type: String,
    pub capability: Arc<dyn Node>,
    pub config: serde_json::Value,
}

/// How the compiler resolved one node's outgoing wiring (§4.6 step 3).
#[derive(Clone)]
pub enum NextHop {
    /// Exactly one distinct target regardless of edge count — collapses
    /// pass-through fan-out into one hop. `port_label` is preserved from
    /// the first collapsed edge purely for the emitted `edge` event (§9
    /// Open Questions: "recommendation: preserve the port label on the
    /// emitted edge event even when the wiring collapses").
    Direct { target: Target, port_label: String },
    /// More than one distinct target: the node's own routing function
    /// decides, or a synthesized fallback that always takes the first
    /// edge's port when the node contributes none (§4.6 step 3).
    Conditional {
        routing: RoutingFn,
        targets: FxHashMap<String, Target>,
        synthesized: bool,
    },
}

/// The executable binding of a [`WorkflowDefinition`] to concrete node
/// capabilities (§4.6). Immutable once built; one `CompiledGraph` is owned
/// by exactly one session (§3.3).
pub struct CompiledGraph {
    pub entry: Target,
    pub nodes: FxHashMap<String, CompiledNode>,
    pub routing: FxHashMap<String, NextHop>,
}

fn resolve_target(id: &str, def: &WorkflowDefinition) -> Target {
    match def.node(id) {
        Some(n) if n.is_end() => Target::End,
        _ => Target::Node(id.to_string()),
    }
}

/// Compiles `def` against `registry` (§4.6). Aborts if validation fails
/// (§4.5) or an instance names an unregistered `nodeType` (§7 "Registry
/// errors").
pub fn compile(def: &WorkflowDefinition, registry: &NodeRegistry) -> Result<CompiledGraph, CompileError> {
    validate(def).map_err(CompileError::Invalid)?;

    let mut nodes = FxHashMap::default();
    for instance in &def.nodes {
        if instance.is_pseudo() {
            continue;
        }
        let spec = registry.get(&instance.node_type).ok_or_else(|| CompileError::UnknownNodeType {
            node_id: instance.id.clone(),
            node_type: instance.node_type.clone(),
        })?;
        nodes.insert(
            instance.id.clone(),
            CompiledNode {
                id: instance.id.clone(),
                label: instance.label.clone(),
                node_type: instance.node_type.clone(),
                capability: Arc::clone(&spec.capability),
                config: instance.config.clone(),
            },
        );
    }

    let start = def.start_node().expect("validator guarantees exactly one start node");
    let start_edges = def.edges_from(&start.id);
    let start_targets: std::collections::HashSet<&str> = start_edges.iter().map(|e| e.target.as_str()).collect();
    if start_targets.len() > 1 {
        return Err(CompileError::AmbiguousEntry(start.id.clone()));
    }
    let entry = resolve_target(start_edges[0].target.as_str(), def);

    let mut routing = FxHashMap::default();
    for instance in &def.nodes {
        if instance.is_pseudo() {
            continue;
        }
        let edges = def.edges_from(&instance.id);
        if edges.is_empty() {
            continue;
        }
        let distinct_targets: std::collections::HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();

        if distinct_targets.len() == 1 {
            let target = resolve_target(edges[0].target.as_str(), def);
            routing.insert(
                instance.id.clone(),
                NextHop::Direct {
                    target,
                    port_label: edges[0].source_port.clone(),
                },
            );
            continue;
        }

        let capability = &nodes.get(&instance.id).expect("registered above").capability;
        let (routing_fn, synthesized) = match capability.routing_function(&instance.config) {
            Some(routing_fn) => (routing_fn, false),
            None => {
                let fallback_port = edges[0].source_port.clone();
                let fallback: RoutingFn = Arc::new(move |_state| fallback_port.clone());
                (fallback, true)
            }
        };

        let mut targets = FxHashMap::default();
        for edge in &edges {
            targets.insert(edge.source_port.clone(), resolve_target(edge.target.as_str(), def));
        }

        routing.insert(
            instance.id.clone(),
            NextHop::Conditional {
                routing: routing_fn,
                targets,
                synthesized,
            },
        );
    }

    Ok(CompiledGraph { entry, nodes, routing })
}

/// A read-only report of the compiler's wiring decisions, renderable
/// without executing the graph (SPEC_FULL §4.6 [EXPANDED], grounded in the
/// Python original's `workflow_inspector.py`).
#[derive(Debug, Clone)]
pub struct CompiledExplanation {
    pub entry: String,
    pub edges: Vec<ExplainedEdge>,
}

#[derive(Debug, Clone)]
pub struct ExplainedEdge {
    pub source: String,
    pub kind: ExplainedKind,
}

#[derive(Debug, Clone)]
pub enum ExplainedKind {
    Direct { target: String, port_label: String, collapsed_from: usize },
    Conditional { ports: Vec<(String, String)>, synthesized: bool },
}

/// Builds a [`CompiledExplanation`] for `def` without running any node.
/// Compiles first (reusing the same wiring decisions `compile` would make)
/// so the report can never drift from what would actually execute.
pub fn explain(def: &WorkflowDefinition, registry: &NodeRegistry) -> Result<CompiledExplanation, CompileError> {
    let graph = compile(def, registry)?;
    let entry = match &graph.entry {
        Target::End => END_NODE_TYPE.to_string(),
        Target::Node(id) => id.clone(),
    };

    let mut edges = Vec::new();
    for instance in &def.nodes {
        if instance.is_pseudo() {
            continue;
        }
        let Some(hop) = graph.routing.get(&instance.id) else {
            continue;
        };
        let kind = match hop {
            NextHop::Direct { target, port_label } => ExplainedKind::Direct {
                target: target_label(target),
                port_label: port_label.clone(),
                collapsed_from: def.edges_from(&instance.id).len(),
            },
            NextHop::Conditional { targets, synthesized, .. } => ExplainedKind::Conditional {
                ports: targets.iter().map(|(port, target)| (port.clone(), target_label(target))).collect(),
                synthesized: *synthesized,
            },
        };
        edges.push(ExplainedEdge {
            source: instance.id.clone(),
            kind,
        });
    }

    Ok(CompiledExplanation { entry, edges })
}

fn target_label(target: &Target) -> String {
    match target {
        Target::End => END_NODE_TYPE.to_string(),
        Target::Node(id) => id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;
    use crate::workflow::templates::{autonomous_template, simple_template};

    #[test]
    fn compiles_the_simple_template() {
        let registry = NodeRegistry::with_builtins();
        let def = simple_template();
        let graph = compile(&def, &registry).unwrap();
        assert!(matches!(graph.entry, Target::Node(ref id) if id == "memory_inject"));
        assert!(matches!(graph.routing.get("post_model"), Some(NextHop::Direct { target: Target::End, .. })));
    }

    #[test]
    fn compiles_classify_as_conditional_with_its_own_routing_function() {
        let registry = NodeRegistry::with_builtins();
        let def = autonomous_template();
        let graph = compile(&def, &registry).unwrap();
        match graph.routing.get("classify") {
            Some(NextHop::Conditional { synthesized, targets, .. }) => {
                assert!(!synthesized);
                assert!(targets.contains_key("easy"));
                assert!(targets.contains_key("hard"));
            }
            other => panic!("expected conditional routing for classify, got {other:?}"),
        }
    }

    #[test]
    fn unknown_node_type_fails_compilation() {
        use crate::workflow::model::{Edge, NodeInstance, WorkflowDefinition};
        let registry = NodeRegistry::with_builtins();
        let def = WorkflowDefinition::new("bad")
            .with_node(NodeInstance::new("start", "start", "Start"))
            .with_node(NodeInstance::new("n1", "does_not_exist", "Mystery"))
            .with_node(NodeInstance::new("end", "end", "End"))
            .with_edge(Edge::new("e1", "start", "n1"))
            .with_edge(Edge::new("e2", "n1", "end"));
        let err = compile(&def, &registry).unwrap_err();
        assert!(matches!(err, CompileError::UnknownNodeType { .. }));
    }

    #[test]
    fn invalid_definition_refuses_to_compile() {
        use crate::workflow::model::WorkflowDefinition;
        let registry = NodeRegistry::with_builtins();
        let def = WorkflowDefinition::new("empty");
        let err = compile(&def, &registry).unwrap_err();
        assert!(matches!(err, CompileError::Invalid(_)));
    }

    #[test]
    fn multiple_edges_to_the_same_target_collapse_to_direct() {
        use crate::workflow::model::{Edge, NodeInstance, WorkflowDefinition};
        let registry = NodeRegistry::with_builtins();
        let def = WorkflowDefinition::new("collapse")
            .with_node(NodeInstance::new("start", "start", "Start"))
            .with_node(NodeInstance::new("n1", "state_setter", "Setter"))
            .with_node(NodeInstance::new("end", "end", "End"))
            .with_edge(Edge::new("e1", "start", "n1"))
            .with_edge(Edge::new("e2", "n1", "end").with_port("ok"))
            .with_edge(Edge::new("e3", "n1", "end").with_port("also_ok"));
        let graph = compile(&def, &registry).unwrap();
        assert!(matches!(graph.routing.get("n1"), Some(NextHop::Direct { target: Target::End, .. })));
    }

    #[test]
    fn explain_reports_without_executing() {
        let registry = NodeRegistry::with_builtins();
        let def = autonomous_template();
        let explanation = explain(&def, &registry).unwrap();
        assert_eq!(explanation.entry, "memory_inject");
        assert!(explanation.edges.iter().any(|e| e.source == "classify"));
    }
}
