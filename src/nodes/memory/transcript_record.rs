use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::cfg_usize;
use crate::resilience::truncate;
use crate::state::{NodeDelta, WorkflowState};
use crate::types::Role;

const DEFAULT_MAX_LENGTH: usize = 5000;

/// Appends `lastOutput` to short-term memory as an assistant turn (§4.3).
/// Best-effort: a memory failure is logged and swallowed, not propagated.
pub struct TranscriptRecord;

#[async_trait]
impl Node for TranscriptRecord {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let max_length = cfg_usize(config, "maxLength", DEFAULT_MAX_LENGTH);
        if let Some(output) = &state.scalars.last_output {
            let truncated = truncate(output, max_length);
            if let Err(err) = ctx.memory.record_message(Role::Assistant, &truncated).await {
                tracing::debug!(error = %err, "transcript record failed; continuing");
            }
        }
        Ok(NodeDelta::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::ScriptedAdapter;
    use crate::memory::mock::InMemoryMemoryManager;
    use std::sync::Arc;

    #[tokio::test]
    async fn records_truncated_last_output() {
        let memory = Arc::new(InMemoryMemoryManager::new(vec![]));
        let ctx = NodeContext::new("s1", Arc::new(ScriptedAdapter::new(vec!["unused"])), memory.clone(), 1, "primary");
        let mut state = WorkflowState::new_with_input("x", 5);
        state.scalars.last_output = Some("a".repeat(20));
        let config = serde_json::json!({"maxLength": 10});
        TranscriptRecord.execute(&state, &ctx, &config).await.unwrap();
        let transcript = memory.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].1.len(), 10);
    }

    #[tokio::test]
    async fn no_last_output_is_a_noop() {
        let memory = Arc::new(InMemoryMemoryManager::new(vec![]));
        let ctx = NodeContext::new("s1", Arc::new(ScriptedAdapter::new(vec!["unused"])), memory.clone(), 1, "primary");
        let state = WorkflowState::new_with_input("x", 5);
        TranscriptRecord.execute(&state, &ctx, &serde_json::json!({})).await.unwrap();
        assert!(memory.transcript().is_empty());
    }
}
