use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError, RoutingFn};
use crate::state::{NodeDelta, WorkflowState};
use crate::types::CompletionSignal;

/// Pure state inspection (§4.3): no model call, no delta. Routes `complete`
/// once the TODO list is exhausted or a terminal signal has already fired.
pub struct CheckProgress;

#[async_trait]
impl Node for CheckProgress {
    async fn execute(&self, _state: &WorkflowState, _ctx: &NodeContext, _config: &Value) -> Result<NodeDelta, NodeError> {
        Ok(NodeDelta::new())
    }

    fn routing_function(&self, _config: &Value) -> Option<RoutingFn> {
        Some(std::sync::Arc::new(|state: &WorkflowState| {
            if is_complete(state) {
                "complete".to_string()
            } else {
                "continue".to_string()
            }
        }))
    }
}

fn is_complete(state: &WorkflowState) -> bool {
    let s = &state.scalars;
    s.is_complete
        || s.error.is_some()
        || matches!(s.completion_signal, CompletionSignal::Complete | CompletionSignal::Blocked)
        || s.current_todo_index >= state.todos.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TodoItem;

    #[test]
    fn routes_continue_while_todos_remain() {
        let mut state = WorkflowState::new_with_input("x", 5);
        state.todos = vec![TodoItem::new_pending("t0", "a", "a"), TodoItem::new_pending("t1", "b", "b")];
        state.scalars.current_todo_index = 1;
        let router = CheckProgress.routing_function(&serde_json::json!({})).unwrap();
        assert_eq!(router(&state), "continue");
    }

    #[test]
    fn routes_complete_once_index_exceeds_todos() {
        let mut state = WorkflowState::new_with_input("x", 5);
        state.todos = vec![TodoItem::new_pending("t0", "a", "a")];
        state.scalars.current_todo_index = 1;
        let router = CheckProgress.routing_function(&serde_json::json!({})).unwrap();
        assert_eq!(router(&state), "complete");
    }

    #[test]
    fn routes_complete_on_error() {
        let mut state = WorkflowState::new_with_input("x", 5);
        state.todos = vec![TodoItem::new_pending("t0", "a", "a")];
        state.scalars.error = Some("boom".to_string());
        let router = CheckProgress.routing_function(&serde_json::json!({})).unwrap();
        assert_eq!(router(&state), "complete");
    }
}
