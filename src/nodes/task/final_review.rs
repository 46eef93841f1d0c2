use async_trait::async_trait;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::task::review_limit;
use crate::nodes::{cfg_str, render_template};
use crate::resilience::truncate;
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};

const DEFAULT_PROMPT: &str = "Review the completed work for \"{input}\" against these step results:\n\n{todoResults}\n\nSummarize whether the task was accomplished.";

/// Synthesizes a review of every TODO result (§4.3), truncating each
/// result to the budget-driven two-tier schedule before including it.
pub struct FinalReview;

#[async_trait]
impl Node for FinalReview {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let limit = review_limit(state.scalars.context_budget.status.is_blocking());
        let todo_results = state
            .todos
            .iter()
            .map(|t| format!("- {}: {}", t.title, truncate(t.result.as_deref().unwrap_or(""), limit)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut template_state = state.clone();
        template_state.metadata.insert("todoResults".to_string(), Value::String(todo_results));

        let template = cfg_str(config, "promptTemplate", DEFAULT_PROMPT);
        let prompt = render_template(&template, &template_state);

        let resilient = ctx.resilient_invoke(&[ChatMessage::user(prompt)], "final_review").await?;

        let scalars = ScalarsDelta {
            review_feedback: Some(resilient.content.clone()),
            fallback: resilient.fallback,
            ..Default::default()
        };

        Ok(NodeDelta::new()
            .with_message(ChatMessage::assistant(resilient.content))
            .with_scalars(scalars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::ScriptedAdapter;
    use crate::memory::mock::InMemoryMemoryManager;
    use crate::state::TodoItem;
    use crate::types::TodoStatus;
    use std::sync::Arc;

    #[tokio::test]
    async fn synthesizes_review_from_todo_results() {
        let mut state = WorkflowState::new_with_input("ship it", 5);
        state.todos = vec![TodoItem {
            status: TodoStatus::Completed,
            result: Some("built the thing".to_string()),
            ..TodoItem::new_pending("t0", "build", "build the thing")
        }];
        let ctx = NodeContext::new(
            "s1",
            Arc::new(ScriptedAdapter::new(vec!["all steps look complete"])),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            1,
            "primary",
        );
        let delta = FinalReview.execute(&state, &ctx, &serde_json::json!({})).await.unwrap();
        assert_eq!(delta.scalars.unwrap().review_feedback.as_deref(), Some("all steps look complete"));
    }
}
