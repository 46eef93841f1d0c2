use async_trait::async_trait;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::{cfg_str, cfg_usize, render_template};
use crate::state::{NodeDelta, TodoItem, WorkflowState};
use crate::structured_output::{augment_prompt_with_schema, extract_json};

const DEFAULT_PROMPT: &str = "Break this task down into a short ordered list of concrete steps: {input}";
const DEFAULT_MAX_TODOS: usize = 20;

/// Plans a list of TODOs from the task input (§4.3). A parse failure is
/// not fatal: it degrades to a single fallback TODO carrying the raw
/// model text, so the hard path always has at least one TODO to execute.
pub struct CreateTodos;

#[async_trait]
impl Node for CreateTodos {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let template = cfg_str(config, "promptTemplate", DEFAULT_PROMPT);
        let max_todos = cfg_usize(config, "maxTodos", DEFAULT_MAX_TODOS);
        let prompt = render_template(&template, state);
        let prompt = augment_prompt_with_schema(
            &prompt,
            "Respond with a JSON array of steps, each either a plain string or an object with \"title\" and \"description\".",
            &[],
        );

        let resilient = ctx.resilient_invoke(&[ChatMessage::user(prompt)], "create_todos").await?;
        let todos = parse_todos(&resilient.content, max_todos);

        Ok(NodeDelta::new()
            .with_message(ChatMessage::assistant(resilient.content))
            .with_todos(todos))
    }
}

fn parse_todos(raw: &str, max_todos: usize) -> Vec<TodoItem> {
    let items = extract_json(raw).ok().and_then(|value| match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get("todos").or_else(|| map.get("steps")).and_then(Value::as_array).cloned(),
        _ => None,
    });

    match items {
        Some(items) if !items.is_empty() => items
            .into_iter()
            .take(max_todos)
            .enumerate()
            .map(|(index, item)| todo_from_value(index, &item))
            .collect(),
        _ => vec![TodoItem::new_pending("todo-0", "Complete task", raw.trim())],
    }
}

fn todo_from_value(index: usize, value: &Value) -> TodoItem {
    let id = format!("todo-{index}");
    match value {
        Value::String(text) => TodoItem::new_pending(id, text, text),
        Value::Object(map) => {
            let title_raw = map.get("title").and_then(Value::as_str);
            let desc_raw = map.get("description").and_then(Value::as_str);
            let title = title_raw.or(desc_raw).unwrap_or("Untitled step");
            let description = desc_raw.or(title_raw).unwrap_or(title);
            TodoItem::new_pending(id, title, description)
        }
        other => TodoItem::new_pending(id, other.to_string(), other.to_string()),
    }
}
