use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::{cfg_bool, cfg_str, render_template, set_named_scalar};
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};

/// Renders `promptTemplate` against state, invokes the model, and writes
/// the response to `outputField` plus the message transcript (§4.3).
pub struct LlmCall;

#[async_trait]
impl Node for LlmCall {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let template = cfg_str(config, "promptTemplate", "{input}");
        let prompt = render_template(&template, state);
        let output_field = cfg_str(config, "outputField", "lastOutput");
        let set_complete = cfg_bool(config, "setComplete", false);

        let mut messages = state.messages.clone();
        messages.push(ChatMessage::user(prompt));

        let resilient = ctx.resilient_invoke(&messages, "llm_call").await?;

        let mut scalars = ScalarsDelta::default();
        let wrote_known_field = set_named_scalar(&mut scalars, &output_field, resilient.content.clone());
        if set_complete {
            scalars.is_complete = Some(true);
        }
        scalars.fallback = resilient.fallback;

        let mut delta = NodeDelta::new()
            .with_message(ChatMessage::assistant(resilient.content.clone()))
            .with_scalars(scalars);

        if !wrote_known_field {
            let mut metadata = FxHashMap::default();
            metadata.insert(output_field.into_owned(), Value::String(resilient.content));
            delta = delta.with_metadata(metadata);
        }

        Ok(delta)
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
    async fn writes_response_to_default_output_field() {
        let state = WorkflowState::new_with_input("hello", 5);
        let delta = LlmCall.execute(&state, &ctx(vec!["hi there"]), &serde_json::json!({})).await.unwrap();
        assert_eq!(delta.scalars.unwrap().last_output.as_deref(), Some("hi there"));
        assert_eq!(delta.messages.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn set_complete_marks_is_complete() {
        let state = WorkflowState::new_with_input("hello", 5);
        let config = serde_json::json!({"setComplete": true});
        let delta = LlmCall.execute(&state, &ctx(vec!["done"]), &config).await.unwrap();
        assert_eq!(delta.scalars.unwrap().is_complete, Some(true));
    }

    #[tokio::test]
    async fn unknown_output_field_falls_back_to_metadata() {
        let state = WorkflowState::new_with_input("hello", 5);
        let config = serde_json::json!({"outputField": "customField"});
        let delta = LlmCall.execute(&state, &ctx(vec!["value"]), &config).await.unwrap();
        let metadata = delta.metadata.unwrap();
        assert_eq!(metadata.get("customField"), Some(&Value::String("value".to_string())));
    }
}
