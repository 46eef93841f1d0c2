use async_trait::async_trait;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::{cfg_str, render_template};
use crate::resilience::truncate;
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};

const DEFAULT_PROMPT: &str = "Draft an answer to: {input}";
const DEFAULT_RETRY_PROMPT: &str = "Revise your answer to: {input}\n\nPrevious attempt:\n{answer}\n\nReviewer feedback:\n{reviewFeedback}";
const FEEDBACK_TRUNCATE_LIMIT: usize = 500;

/// Medium-path drafter (§4.3). Redrafts using `retryPromptTemplate` once a
/// review cycle has left feedback; truncates that feedback under budget
/// pressure the same way Execute TODO and Final Review do.
pub struct Answer;

#[async_trait]
impl Node for Answer {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let is_retry = state.scalars.review_count > 0 && state.scalars.review_feedback.is_some();

        let prompt = if is_retry {
            let template = cfg_str(config, "retryPromptTemplate", DEFAULT_RETRY_PROMPT);
            let mut retry_state = state.clone();
            if state.scalars.context_budget.status.is_blocking() {
                if let Some(feedback) = &state.scalars.review_feedback {
                    retry_state.scalars.review_feedback = Some(truncate(feedback, FEEDBACK_TRUNCATE_LIMIT));
                }
            }
            render_template(&template, &retry_state)
        } else {
            let template = cfg_str(config, "promptTemplate", DEFAULT_PROMPT);
            render_template(&template, state)
        };

        let resilient = ctx.resilient_invoke(&[ChatMessage::user(prompt)], "answer").await?;

        let scalars = ScalarsDelta {
            answer: Some(resilient.content.clone()),
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
    use std::sync::Arc;

    fn ctx(responses: Vec<&str>) -> NodeContext {
        NodeContext::new(
            "s1",
            Arc::new(ScriptedAdapter::new(responses)),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            1,
            "primary",
        )
    }

    #[tokio::test]
    async fn first_pass_uses_draft_prompt() {
        let state = WorkflowState::new_with_input("explain rust", 5);
        let delta = Answer.execute(&state, &ctx(vec!["draft answer"]), &serde_json::json!({})).await.unwrap();
        assert_eq!(delta.scalars.unwrap().answer.as_deref(), Some("draft answer"));
    }

    #[tokio::test]
    async fn redraft_after_feedback_uses_retry_prompt() {
        let mut state = WorkflowState::new_with_input("explain rust", 5);
        state.scalars.answer = Some("first attempt".to_string());
        state.scalars.review_count = 1;
        state.scalars.review_feedback = Some("too short".to_string());

        let delta = Answer.execute(&state, &ctx(vec!["revised answer"]), &serde_json::json!({})).await.unwrap();
        assert_eq!(delta.scalars.unwrap().answer.as_deref(), Some("revised answer"));
    }
}
