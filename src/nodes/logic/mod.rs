//! Pure data-flow nodes (§4.3): no model call, no memory access — state
//! mutation or routing driven entirely by each node's own config.

mod conditional_router;
mod state_setter;

use std::sync::Arc;

use crate::registry::{NodeCategory, NodeRegistry, NodeSpec, ParamDescriptor, ParamKind};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(NodeSpec {
        node_type: "state_setter",
        label: "State Setter",
        category: NodeCategory::Logic,
        params: vec![ParamDescriptor::new(
            "stateUpdates",
            ParamKind::Json,
            "JSON object merged into state; invalid JSON is a no-op.",
        )],
        output_ports: vec!["default"],
        capability: Arc::new(state_setter::StateSetter),
    });

    registry.register(NodeSpec {
        node_type: "conditional_router",
        label: "Conditional Router",
        category: NodeCategory::Logic,
        params: vec![
            ParamDescriptor::new("routingField", ParamKind::String, "State field whose value selects the route.").required(),
            ParamDescriptor::new("routeMap", ParamKind::Json, "Map from normalized field value to output port."),
            ParamDescriptor::new("defaultPort", ParamKind::String, "Port used when the field value has no entry in routeMap.")
                .with_default(serde_json::json!("default")),
        ],
        output_ports: vec!["default"],
        capability: Arc::new(conditional_router::ConditionalRouter),
    });
}
