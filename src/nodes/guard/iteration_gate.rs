use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError, RoutingFn};
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};
use crate::types::CompletionSignal;

/// Routes `stop` once the loop has run its course (§4.3): the iteration
/// cap is hit, the context budget has become blocking, or a terminal
/// completion signal fired. Sets `isComplete` on stop.
pub struct IterationGate;

#[async_trait]
impl Node for IterationGate {
    async fn execute(&self, state: &WorkflowState, _ctx: &NodeContext, _config: &Value) -> Result<NodeDelta, NodeError> {
        if should_stop(state) {
            Ok(NodeDelta::new().with_scalars(ScalarsDelta {
                is_complete: Some(true),
                ..Default::default()
            }))
        } else {
            Ok(NodeDelta::new())
        }
    }

    fn routing_function(&self, _config: &Value) -> Option<RoutingFn> {
        Some(std::sync::Arc::new(|state: &WorkflowState| {
            if should_stop(state) {
                "stop".to_string()
            } else {
                "continue".to_string()
            }
        }))
    }
}

fn should_stop(state: &WorkflowState) -> bool {
    let s = &state.scalars;
    s.iteration >= s.max_iterations
        || s.context_budget.status.is_blocking()
        || matches!(s.completion_signal, CompletionSignal::Complete | CompletionSignal::Blocked | CompletionSignal::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::ScriptedAdapter;
    use crate::memory::mock::InMemoryMemoryManager;
    use std::sync::Arc;

    fn ctx() -> NodeContext {
        NodeContext::new(
            "s1",
            Arc::new(ScriptedAdapter::new(vec!["unused"])),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            1,
            "primary",
        )
    }

    #[tokio::test]
    async fn stops_when_iteration_cap_reached() {
        let mut state = WorkflowState::new_with_input("x", 3);
        state.scalars.iteration = 3;
        let delta = IterationGate.execute(&state, &ctx(), &serde_json::json!({})).await.unwrap();
        assert_eq!(delta.scalars.unwrap().is_complete, Some(true));
        let router = IterationGate.routing_function(&serde_json::json!({})).unwrap();
        assert_eq!(router(&state), "stop");
    }

    #[tokio::test]
    async fn continues_under_budget_and_below_cap() {
        let state = WorkflowState::new_with_input("x", 10);
        let delta = IterationGate.execute(&state, &ctx(), &serde_json::json!({})).await.unwrap();
        assert!(delta.scalars.is_none());
        let router = IterationGate.routing_function(&serde_json::json!({})).unwrap();
        assert_eq!(router(&state), "continue");
    }
}
