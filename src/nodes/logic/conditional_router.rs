use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError, RoutingFn};
use crate::nodes::template_field;
use crate::state::{NodeDelta, WorkflowState};

const DEFAULT_PORT: &str = "default";

/// Reads `state[routingField]`, normalizes it, and looks it up in
/// `routeMap` (§4.3). A miss falls back to `defaultPort`. The node's own
/// `execute` contributes no delta — all of its behavior is in routing.
pub struct ConditionalRouter;

#[async_trait]
impl Node for ConditionalRouter {
    async fn execute(&self, _state: &WorkflowState, _ctx: &NodeContext, _config: &Value) -> Result<NodeDelta, NodeError> {
        Ok(NodeDelta::new())
    }

    fn routing_function(&self, config: &Value) -> Option<RoutingFn> {
        let routing_field = config.get("routingField").and_then(Value::as_str)?.to_string();
        let route_map = config.get("routeMap").and_then(Value::as_object).cloned().unwrap_or_default();
        let default_port = config.get("defaultPort").and_then(Value::as_str).unwrap_or(DEFAULT_PORT).to_string();

        Some(std::sync::Arc::new(move |state: &WorkflowState| {
            let raw = template_field(state, &routing_field).unwrap_or_default();
            let normalized = raw.trim().to_ascii_lowercase();
            route_map
                .get(&normalized)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| default_port.clone())
        }))
    }

    fn dynamic_output_ports(&self, config: &Value) -> Option<Vec<String>> {
        let route_map = config.get("routeMap").and_then(Value::as_object)?;
        let default_port = config.get("defaultPort").and_then(Value::as_str).unwrap_or(DEFAULT_PORT);

        let mut ports: Vec<String> = route_map.values().filter_map(Value::as_str).map(str::to_string).collect();
        if !ports.iter().any(|p| p == default_port) {
            ports.push(default_port.to_string());
        }
        ports.sort();
        ports.dedup();
        Some(ports)
    }
}
