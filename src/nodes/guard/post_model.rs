use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::cfg_bool;
use crate::resilience::parse_completion_signal;
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};
use crate::types::Role;

/// Advances the iteration counter and parses the completion-signal grammar
/// out of `lastOutput` (§4.3). Optionally records the transcript,
/// best-effort.
pub struct PostModel;

#[async_trait]
impl Node for PostModel {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let record_transcript = cfg_bool(config, "recordTranscript", false);

        let (signal, detail) = state
            .scalars
            .last_output
            .as_deref()
            .map(parse_completion_signal)
            .unwrap_or_default();

        if record_transcript {
            if let Some(output) = &state.scalars.last_output {
                if let Err(err) = ctx.memory.record_message(Role::Assistant, output).await {
                    tracing::debug!(error = %err, "post_model transcript record failed; continuing");
                }
            }
        }

        let scalars = ScalarsDelta {
            iteration: Some(state.scalars.iteration + 1),
            completion_signal: Some(signal),
            completion_detail: detail,
            ..Default::default()
        };

        Ok(NodeDelta::new().with_scalars(scalars))
    }
}
