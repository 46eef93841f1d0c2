//! State-observer nodes that gate the agentic loop (§4.3): none of these
//! call the model. They read state, classify it, and either annotate it
//! (Context Guard, Post Model) or route on it (Iteration Gate).

mod context_guard;
mod iteration_gate;
mod post_model;

use std::sync::Arc;

use crate::registry::{NodeCategory, NodeRegistry, NodeSpec, ParamDescriptor, ParamKind};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(NodeSpec {
        node_type: "context_guard",
        label: "Context Guard",
        category: NodeCategory::Guard,
        params: vec![ParamDescriptor::new("contextLimit", ParamKind::Number, "Token budget the usage ratio is measured against.")
            .with_default(serde_json::json!(100_000))],
        output_ports: vec!["default"],
        capability: Arc::new(context_guard::ContextGuard),
    });

    registry.register(NodeSpec {
        node_type: "post_model",
        label: "Post Model",
        category: NodeCategory::Guard,
        params: vec![ParamDescriptor::new("recordTranscript", ParamKind::Boolean, "Whether to record lastOutput to memory.")
            .with_default(serde_json::json!(false))],
        output_ports: vec!["default"],
        capability: Arc::new(post_model::PostModel),
    });

    registry.register(NodeSpec {
        node_type: "iteration_gate",
        label: "Iteration Gate",
        category: NodeCategory::Guard,
        params: vec![],
        output_ports: vec!["continue", "stop"],
        capability: Arc::new(iteration_gate::IterationGate),
    });
}
