use async_trait::async_trait;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError, RoutingFn};
use crate::nodes::{cfg_str, render_template};
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};
use crate::types::Difficulty;

const DEFAULT_PROMPT: &str = "Classify the difficulty of this task as exactly one word, \
easy, medium, or hard: {input}";

/// Classifies the task's difficulty (§4.3) and routes to the matching port.
pub struct Classify;

#[async_trait]
impl Node for Classify {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let template = cfg_str(config, "promptTemplate", DEFAULT_PROMPT);
        let prompt = render_template(&template, state);

        // A model-call failure here routes `end` (§4.3: "routes `end` on
        // error") rather than propagating as a hard `NodeError` — it's a
        // routing outcome for this node, not a fatal one.
        let resilient = match ctx.resilient_invoke(&[ChatMessage::user(prompt)], "classify").await {
            Ok(resilient) => resilient,
            Err(err) => {
                let scalars = ScalarsDelta { error: Some(err.to_string()), ..Default::default() };
                return Ok(NodeDelta::new().with_scalars(scalars));
            }
        };
        let difficulty = Difficulty::parse_or_medium(&resilient.content);

        let scalars = ScalarsDelta {
            difficulty: Some(difficulty),
            fallback: resilient.fallback,
            ..Default::default()
        };

        Ok(NodeDelta::new().with_scalars(scalars))
    }

    fn routing_function(&self, _config: &Value) -> Option<RoutingFn> {
        Some(std::sync::Arc::new(|state: &WorkflowState| {
            if state.scalars.error.is_some() {
                return "end".to_string();
            }
            match state.scalars.difficulty {
                Some(Difficulty::Easy) => "easy".to_string(),
                Some(Difficulty::Hard) => "hard".to_string(),
                Some(Difficulty::Medium) | None => "medium".to_string(),
            }
        }))
    }
}
