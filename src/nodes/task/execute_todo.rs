use async_trait::async_trait;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::task::todo_history_limit;
use crate::nodes::{cfg_str, render_template};
use crate::resilience::truncate;
use crate::state::{NodeDelta, ScalarsDelta, TodoItem, WorkflowState};
use crate::types::TodoStatus;

const DEFAULT_PROMPT: &str = "Task: {input}\n\nCurrent step: {currentStep}\n\n{priorResults}\n\nComplete this step.";

/// Executes `todos[currentTodoIndex]` (§4.3), folding prior completed
/// results into the prompt (truncated per the budget-driven two-tier
/// schedule), and advances the index whether the step succeeds or fails.
pub struct ExecuteTodo;

#[async_trait]
impl Node for ExecuteTodo {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let index = state.scalars.current_todo_index;
        let current = state.todos.get(index).ok_or(NodeError::MissingInput { what: "todos[currentTodoIndex]" })?;

        let limit = todo_history_limit(state.scalars.context_budget.status.is_blocking());
        let prior_results = state
            .todos
            .iter()
            .take(index)
            .filter(|t| t.status == TodoStatus::Completed)
            .filter_map(|t| t.result.as_deref())
            .map(|r| format!("- {}", truncate(r, limit)))
            .collect::<Vec<_>>()
            .join("\n");

        let mut template_state = state.clone();
        template_state.scalars.current_step = Some(current.title.clone());
        template_state.metadata.insert("priorResults".to_string(), Value::String(prior_results));

        let template = cfg_str(config, "promptTemplate", DEFAULT_PROMPT);
        let prompt = render_template(&template, &template_state);

        let mut todos = state.todos.clone();
        let outcome = ctx.resilient_invoke(&[ChatMessage::user(prompt)], "execute_todo").await;

        let fallback = match outcome {
            Ok(resilient) => {
                todos[index] = TodoItem {
                    status: TodoStatus::Completed,
                    result: Some(resilient.content.clone()),
                    ..todos[index].clone()
                };
                resilient.fallback
            }
            Err(err) => {
                todos[index] = TodoItem {
                    status: TodoStatus::Failed,
                    result: Some(err.to_string()),
                    ..todos[index].clone()
                };
                None
            }
        };

        let scalars = ScalarsDelta {
            current_todo_index: Some(index + 1),
            current_step: Some(current.title.clone()),
            fallback,
            ..Default::default()
        };

        Ok(NodeDelta::new().with_todos(todos).with_scalars(scalars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::{FailingAdapter, ScriptedAdapter};
    use crate::memory::mock::InMemoryMemoryManager;
    use std::sync::Arc;

    fn state_with_todo() -> WorkflowState {
        let mut state = WorkflowState::new_with_input("build it", 5);
        state.todos = vec![TodoItem::new_pending("todo-0", "step one", "do the first thing")];
        state
    }

    #[tokio::test]
    async fn completes_todo_and_advances_index() {
        let ctx = NodeContext::new(
            "s1",
            Arc::new(ScriptedAdapter::new(vec!["done with step one"])),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            1,
            "primary",
        );
        let state = state_with_todo();
        let delta = ExecuteTodo.execute(&state, &ctx, &serde_json::json!({})).await.unwrap();
        let todos = delta.todos.unwrap();
        assert_eq!(todos[0].status, TodoStatus::Completed);
        assert_eq!(delta.scalars.unwrap().current_todo_index, Some(1));
    }

    #[tokio::test]
    async fn failure_marks_todo_failed_but_still_advances() {
        let ctx = NodeContext::new(
            "s1",
            Arc::new(FailingAdapter),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            0,
            "primary",
        );
        let state = state_with_todo();
        let delta = ExecuteTodo.execute(&state, &ctx, &serde_json::json!({})).await.unwrap();
        let todos = delta.todos.unwrap();
        assert_eq!(todos[0].status, TodoStatus::Failed);
        assert_eq!(delta.scalars.unwrap().current_todo_index, Some(1));
    }
}
