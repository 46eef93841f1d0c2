use async_trait::async_trait;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::{cfg_str, render_template};
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};

const DEFAULT_PROMPT: &str = "Answer directly and concisely: {input}";

/// Single-shot answer for the easy path (§4.3): one model call, writes
/// `answer`, `finalAnswer`, and marks the run complete.
pub struct DirectAnswer;

#[async_trait]
impl Node for DirectAnswer {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let template = cfg_str(config, "promptTemplate", DEFAULT_PROMPT);
        let prompt = render_template(&template, state);

        let resilient = ctx.resilient_invoke(&[ChatMessage::user(prompt)], "direct_answer").await?;

        let scalars = ScalarsDelta {
            answer: Some(resilient.content.clone()),
            final_answer: Some(resilient.content.clone()),
            is_complete: Some(true),
            fallback: resilient.fallback,
            ..Default::default()
        };

        Ok(NodeDelta::new()
            .with_message(ChatMessage::assistant(resilient.content))
            .with_scalars(scalars))
    }
}
