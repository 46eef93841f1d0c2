//! The workflow validator (§4.5): runs before compilation and before save.
//! Validation rules are exactly the §3.2 invariants. Errors are returned as
//! a list of human-readable strings — compilation aborts if the list is
//! nonempty (§7: "Validation errors").

use std::collections::HashSet;

use super::model::{WorkflowDefinition, END_NODE_TYPE, START_NODE_TYPE};

/// Validates the structural invariants of §3.2. Returns `Ok(())` when the
/// definition is sound, or the full list of violations otherwise — callers
/// should surface every error at once rather than stopping at the first.
pub fn validate(def: &WorkflowDefinition) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let start_nodes: Vec<_> = def.nodes.iter().filter(|n| n.node_type == START_NODE_TYPE).collect();
    match start_nodes.len() {
        1 => {}
        0 => errors.push("workflow must have exactly one start node, found 0".to_string()),
        n => errors.push(format!("workflow must have exactly one start node, found {n}")),
    }

    let end_count = def.nodes.iter().filter(|n| n.node_type == END_NODE_TYPE).count();
    if end_count == 0 {
        errors.push("workflow must have at least one end node".to_string());
    }

    let ids: HashSet<&str> = def.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &def.edges {
        if !ids.contains(edge.source.as_str()) {
            errors.push(format!("edge {} references unknown source node {}", edge.id, edge.source));
        }
        if !ids.contains(edge.target.as_str()) {
            errors.push(format!("edge {} references unknown target node {}", edge.id, edge.target));
        }
    }

    if let Some(start) = start_nodes.first() {
        let outgoing = def.edges.iter().filter(|e| e.source == start.id).count();
        if outgoing == 0 {
            errors.push(format!("start node {} must have at least one outgoing edge", start.id));
        }
    }

    for node in &def.nodes {
        if node.is_pseudo() {
            continue;
        }
        let has_incoming = def.edges.iter().any(|e| e.target == node.id);
        let has_outgoing = def.edges.iter().any(|e| e.source == node.id);
        if !has_incoming && !has_outgoing {
            errors.push(format!("node {} ({}) is orphaned: no incoming or outgoing edges", node.id, node.node_type));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::{Edge, NodeInstance, WorkflowDefinition};

    fn valid_def() -> WorkflowDefinition {
        WorkflowDefinition::new("t")
            .with_node(NodeInstance::new("start", "start", "Start"))
            .with_node(NodeInstance::new("n1", "llm_call", "Call"))
            .with_node(NodeInstance::new("end", "end", "End"))
            .with_edge(Edge::new("e1", "start", "n1"))
            .with_edge(Edge::new("e2", "n1", "end"))
    }

    #[test]
    fn accepts_a_well_formed_graph() {
        assert!(validate(&valid_def()).is_ok());
    }

    #[test]
    fn rejects_missing_start() {
        let mut def = valid_def();
        def.nodes.retain(|n| n.node_type != "start");
        def.edges.retain(|e| e.source != "start");
        let errors = validate(&def).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("exactly one start node")));
    }

    #[test]
    fn rejects_duplicate_start() {
        let def = valid_def().with_node(NodeInstance::new("start2", "start", "Start2"));
        let errors = validate(&def).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("found 2")));
    }

    #[test]
    fn rejects_missing_end() {
        let mut def = valid_def();
        def.nodes.retain(|n| n.node_type != "end");
        let errors = validate(&def).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("at least one end node")));
    }

    #[test]
    fn rejects_dangling_edge_target() {
        let def = valid_def().with_edge(Edge::new("e3", "n1", "ghost"));
        let errors = validate(&def).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("unknown target node ghost")));
    }

    #[test]
    fn rejects_start_with_no_outgoing_edge() {
        let mut def = valid_def();
        def.edges.retain(|e| e.source != "start");
        let errors = validate(&def).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("at least one outgoing edge")));
    }

    #[test]
    fn rejects_orphaned_non_boundary_node() {
        let def = valid_def().with_node(NodeInstance::new("orphan", "review", "Orphan"));
        let errors = validate(&def).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("is orphaned")));
    }
}
