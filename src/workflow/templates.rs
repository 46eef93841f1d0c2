//! Built-in workflow templates (§6.3: "built-in templates are
//! unconditionally re-written into the store"). `simple` is the Session
//! Façade's fallback template (§4.8) when no `workflowId`/`graphName` hint
//! resolves; `autonomous` is the classify → easy/medium/hard branch used by
//! the end-to-end scenarios in spec.md §8.

use serde_json::json;

use super::model::{Edge, NodeInstance, WorkflowDefinition};

/// `start → memory_inject → context_guard → llm_call(setComplete) →
/// post_model → end`. Matches spec.md §8 end-to-end scenario 1.
#[must_use]
pub fn simple_template() -> WorkflowDefinition {
    let mut def = WorkflowDefinition::new("Simple")
        .with_node(NodeInstance::new("start", "start", "Start"))
        .with_node(NodeInstance::new("memory_inject", "memory_inject", "Inject Memory"))
        .with_node(NodeInstance::new("context_guard", "context_guard", "Context Guard"))
        .with_node(
            NodeInstance::new("llm_call", "llm_call", "Respond").with_config(json!({
                "promptTemplate": "{input}",
                "setComplete": true,
            })),
        )
        .with_node(NodeInstance::new("post_model", "post_model", "Post Model"))
        .with_node(NodeInstance::new("end", "end", "End"))
        .with_edge(Edge::new("e-start", "start", "memory_inject"))
        .with_edge(Edge::new("e-guard", "memory_inject", "context_guard"))
        .with_edge(Edge::new("e-llm", "context_guard", "llm_call"))
        .with_edge(Edge::new("e-post", "llm_call", "post_model"))
        .with_edge(Edge::new("e-end", "post_model", "end"));
    def.is_template = true;
    def.template_name = Some("simple".to_string());
    def.description = "Single LLM call with memory injection and context guarding.".to_string();
    def
}

/// Classify → {easy: direct answer, medium: answer/review loop, hard:
/// TODO plan/execute loop} → post_model → end. Classify also routes
/// straight to `end` on a model-call error (§4.3). Matches spec.md §8
/// scenarios 2-4.
#[must_use]
pub fn autonomous_template() -> WorkflowDefinition {
    let mut def = WorkflowDefinition::new("Autonomous")
        .with_node(NodeInstance::new("start", "start", "Start"))
        .with_node(NodeInstance::new("memory_inject", "memory_inject", "Inject Memory"))
        .with_node(NodeInstance::new("classify", "classify", "Classify"))
        .with_node(NodeInstance::new("direct_answer", "direct_answer", "Direct Answer"))
        .with_node(
            NodeInstance::new("answer", "answer", "Draft Answer")
                .with_config(json!({"promptTemplate": "Answer the task: {input}"})),
        )
        .with_node(NodeInstance::new("review", "review", "Review").with_config(json!({"maxRetries": 2})))
        .with_node(NodeInstance::new("create_todos", "create_todos", "Plan TODOs"))
        .with_node(NodeInstance::new("execute_todo", "execute_todo", "Execute TODO"))
        .with_node(NodeInstance::new("check_progress", "check_progress", "Check Progress"))
        .with_node(NodeInstance::new("final_review", "final_review", "Final Review"))
        .with_node(NodeInstance::new("final_answer", "final_answer", "Final Answer"))
        .with_node(NodeInstance::new("post_model", "post_model", "Post Model"))
        .with_node(NodeInstance::new("end", "end", "End"))
        .with_edge(Edge::new("e-start", "start", "memory_inject"))
        .with_edge(Edge::new("e-classify", "memory_inject", "classify"))
        .with_edge(Edge::new("e-easy", "classify", "direct_answer").with_port("easy"))
        .with_edge(Edge::new("e-medium", "classify", "answer").with_port("medium"))
        .with_edge(Edge::new("e-hard", "classify", "create_todos").with_port("hard"))
        .with_edge(Edge::new("e-classify-error", "classify", "end").with_port("end"))
        .with_edge(Edge::new("e-direct-post", "direct_answer", "post_model"))
        .with_edge(Edge::new("e-answer-review", "answer", "review"))
        .with_edge(Edge::new("e-retry", "review", "answer").with_port("retry"))
        .with_edge(Edge::new("e-approved", "review", "post_model").with_port("approved"))
        .with_edge(Edge::new("e-todos-exec", "create_todos", "execute_todo"))
        .with_edge(Edge::new("e-exec-check", "execute_todo", "check_progress"))
        .with_edge(Edge::new("e-check-continue", "check_progress", "execute_todo").with_port("continue"))
        .with_edge(Edge::new("e-check-complete", "check_progress", "final_review").with_port("complete"))
        .with_edge(Edge::new("e-final-review-answer", "final_review", "final_answer"))
        .with_edge(Edge::new("e-final-post", "final_answer", "post_model"))
        .with_edge(Edge::new("e-post-end", "post_model", "end"));
    def.is_template = true;
    def.template_name = Some("autonomous".to_string());
    def.description = "Classifies task difficulty and branches into direct/review/plan-execute paths.".to_string();
    def
}

/// Every built-in template, in the order the store re-installs them.
#[must_use]
pub fn all() -> Vec<WorkflowDefinition> {
    vec![simple_template(), autonomous_template()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::validator::validate;

    #[test]
    fn simple_template_is_structurally_valid() {
        assert!(validate(&simple_template()).is_ok());
    }

    #[test]
    fn autonomous_template_is_structurally_valid() {
        assert!(validate(&autonomous_template()).is_ok());
    }
}
