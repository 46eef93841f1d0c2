//! Model-calling nodes (§4.3): every node here issues at least one
//! `ctx.resilient_invoke` round-trip.

mod answer;
mod classify;
mod direct_answer;
mod llm_call;
mod review;

use std::sync::Arc;

use crate::registry::{NodeCategory, NodeRegistry, NodeSpec, ParamDescriptor, ParamKind};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(NodeSpec {
        node_type: "llm_call",
        label: "LLM Call",
        category: NodeCategory::Model,
        params: vec![
            ParamDescriptor::new("promptTemplate", ParamKind::PromptTemplate, "Prompt rendered against state before the call.").required(),
            ParamDescriptor::new("outputField", ParamKind::String, "State field the response is written to.")
                .with_default(serde_json::json!("lastOutput")),
            ParamDescriptor::new("setComplete", ParamKind::Boolean, "Whether a successful call sets isComplete.")
                .with_default(serde_json::json!(false)),
        ],
        output_ports: vec!["default"],
        capability: Arc::new(llm_call::LlmCall),
    });

    registry.register(NodeSpec {
        node_type: "classify",
        label: "Classify",
        category: NodeCategory::Model,
        params: vec![ParamDescriptor::new(
            "promptTemplate",
            ParamKind::PromptTemplate,
            "Classification prompt; defaults to a built-in easy/medium/hard prompt.",
        )],
        output_ports: vec!["easy", "medium", "hard", "end"],
        capability: Arc::new(classify::Classify),
    });

    registry.register(NodeSpec {
        node_type: "direct_answer",
        label: "Direct Answer",
        category: NodeCategory::Model,
        params: vec![ParamDescriptor::new(
            "promptTemplate",
            ParamKind::PromptTemplate,
            "Single-shot answer prompt for the easy path.",
        )],
        output_ports: vec!["default"],
        capability: Arc::new(direct_answer::DirectAnswer),
    });

    registry.register(NodeSpec {
        node_type: "answer",
        label: "Answer",
        category: NodeCategory::Model,
        params: vec![
            ParamDescriptor::new("promptTemplate", ParamKind::PromptTemplate, "Medium-path drafting prompt."),
            ParamDescriptor::new("retryPromptTemplate", ParamKind::PromptTemplate, "Prompt used when redrafting after review feedback."),
        ],
        output_ports: vec!["default"],
        capability: Arc::new(answer::Answer),
    });

    registry.register(NodeSpec {
        node_type: "review",
        label: "Review",
        category: NodeCategory::Model,
        params: vec![ParamDescriptor::new("maxRetries", ParamKind::Number, "Review cycles allowed before forced approval.")
            .with_default(serde_json::json!(3))],
        output_ports: vec!["approved", "retry"],
        capability: Arc::new(review::Review),
    });
}
