//! Task-decomposition nodes (§4.3): the hard-path pipeline that plans a
//! list of TODOs, executes them one at a time, and synthesizes a final
//! answer from their results.

mod check_progress;
mod create_todos;
mod execute_todo;
mod final_answer;
mod final_review;

use std::sync::Arc;

use crate::registry::{NodeCategory, NodeRegistry, NodeSpec, ParamDescriptor, ParamKind};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(NodeSpec {
        node_type: "create_todos",
        label: "Create TODOs",
        category: NodeCategory::Task,
        params: vec![
            ParamDescriptor::new("promptTemplate", ParamKind::PromptTemplate, "Planning prompt requesting a JSON list of TODOs."),
            ParamDescriptor::new("maxTodos", ParamKind::Number, "Upper bound on the number of planned TODOs.")
                .with_default(serde_json::json!(20)),
        ],
        output_ports: vec!["default"],
        capability: Arc::new(create_todos::CreateTodos),
    });

    registry.register(NodeSpec {
        node_type: "execute_todo",
        label: "Execute TODO",
        category: NodeCategory::Task,
        params: vec![ParamDescriptor::new(
            "promptTemplate",
            ParamKind::PromptTemplate,
            "Per-TODO execution prompt; includes prior completed results.",
        )],
        output_ports: vec!["default"],
        capability: Arc::new(execute_todo::ExecuteTodo),
    });

    registry.register(NodeSpec {
        node_type: "check_progress",
        label: "Check Progress",
        category: NodeCategory::Task,
        params: vec![],
        output_ports: vec!["continue", "complete"],
        capability: Arc::new(check_progress::CheckProgress),
    });

    registry.register(NodeSpec {
        node_type: "final_review",
        label: "Final Review",
        category: NodeCategory::Task,
        params: vec![ParamDescriptor::new(
            "promptTemplate",
            ParamKind::PromptTemplate,
            "Review prompt synthesizing all TODO results.",
        )],
        output_ports: vec!["default"],
        capability: Arc::new(final_review::FinalReview),
    });

    registry.register(NodeSpec {
        node_type: "final_answer",
        label: "Final Answer",
        category: NodeCategory::Task,
        params: vec![ParamDescriptor::new(
            "promptTemplate",
            ParamKind::PromptTemplate,
            "Final synthesis prompt.",
        )],
        output_ports: vec!["default"],
        capability: Arc::new(final_answer::FinalAnswer),
    });
}

/// Truncates `text` under budget pressure: 200 chars once the budget has
/// reached `block`/`overflow`, else 500 — the two-tier schedule Execute
/// TODO uses for prior-result context (§4.3).
#[must_use]
pub(crate) fn todo_history_limit(blocking: bool) -> usize {
    if blocking {
        200
    } else {
        500
    }
}

/// Final Review's two-tier schedule: 500 under pressure, 2000 otherwise.
#[must_use]
pub(crate) fn review_limit(blocking: bool) -> usize {
    if blocking {
        500
    } else {
        2000
    }
}
