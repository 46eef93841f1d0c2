use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::{cfg_str, render_template, set_named_scalar};
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};

/// Merges a JSON object from `stateUpdates` into the state (§4.3). The
/// template is rendered against state first, then parsed; invalid JSON —
/// or a value that isn't a JSON object — is a no-op rather than an error.
pub struct StateSetter;

#[async_trait]
impl Node for StateSetter {
    async fn execute(&self, state: &WorkflowState, _ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let template = cfg_str(config, "stateUpdates", "{}");
        let rendered = render_template(&template, state);

        let Ok(Value::Object(updates)) = serde_json::from_str::<Value>(&rendered) else {
            return Ok(NodeDelta::new());
        };

        let mut scalars = ScalarsDelta::default();
        let mut metadata = FxHashMap::default();

        for (key, value) in updates {
            let as_string = match &value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            if !set_named_scalar(&mut scalars, &key, as_string) {
                metadata.insert(key, value);
            }
        }

        let mut delta = NodeDelta::new().with_scalars(scalars);
        if !metadata.is_empty() {
            delta = delta.with_metadata(metadata);
        }
        Ok(delta)
    }
}
