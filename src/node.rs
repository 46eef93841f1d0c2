//! The node capability (§4.2): every node type in the registry implements
//! [`Node`], optionally contributing a routing function and/or a dynamic
//! port resolver.

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::adapter::ModelAdapter;
use crate::memory::MemoryManager;
use crate::resilience::{ResilienceError, Resilient};
use crate::state::WorkflowState;

/// A node's routing decision: given the full state, return the output port
/// id to follow. Conditional edges only exist when a node contributes one
/// of these (§4.1/§4.6).
pub type RoutingFn = Arc<dyn Fn(&WorkflowState) -> String + Send + Sync>;

/// Every node type in the registry implements this capability (§4.2).
/// `config` is the user-bound parameter map from the node's
/// [`crate::workflow::NodeInstance`] — data only, never behavior (Design
/// Notes §9).
#[async_trait]
pub trait Node: Send + Sync {
    /// Computes this node's state delta. Mandatory.
    async fn execute(
        &self,
        state: &WorkflowState,
        ctx: &NodeContext,
        config: &Value,
    ) -> Result<crate::state::NodeDelta, NodeError>;

    /// When present and the node has more than one outgoing target, the
    /// compiler treats the node as conditional (§4.6).
    fn routing_function(&self, _config: &Value) -> Option<RoutingFn> {
        None
    }

    /// Overrides the node spec's static output ports for nodes whose port
    /// set derives from config (e.g. Conditional Router, §4.3).
    fn dynamic_output_ports(&self, _config: &Value) -> Option<Vec<String>> {
        None
    }
}

/// What §4.2 calls `ExecutionContext`: everything a node needs beyond the
/// state itself and its own config.
#[derive(Clone)]
pub struct NodeContext {
    pub session_id: String,
    pub model: Arc<dyn ModelAdapter>,
    pub memory: Arc<dyn MemoryManager>,
    pub max_retries: u32,
    pub model_name: String,
}

impl NodeContext {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        model: Arc<dyn ModelAdapter>,
        memory: Arc<dyn MemoryManager>,
        max_retries: u32,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            model,
            memory,
            max_retries,
            model_name: model_name.into(),
        }
    }

    /// The convenience described in §4.2/§4.6/§7: a model call wrapped with
    /// retry and fallback-ladder demotion.
    pub async fn resilient_invoke(
        &self,
        messages: &[crate::message::ChatMessage],
        node_name: &str,
    ) -> Result<Resilient, ResilienceError> {
        crate::resilience::resilient_invoke(self.model.as_ref(), messages, node_name, self.max_retries, &self.model_name).await
    }
}

/// Node execution-time errors (§7: "node execution errors").
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(flowgraph::node::missing_input),
        help("Check that an earlier node in the graph produced {what}.")
    )]
    MissingInput { what: &'static str },

    #[error("model provider error: {0}")]
    #[diagnostic(code(flowgraph::node::provider))]
    Provider(#[from] ResilienceError),

    #[error("structured output error: {0}")]
    #[diagnostic(code(flowgraph::node::structured_output))]
    StructuredOutput(#[from] crate::structured_output::StructuredOutputError),

    #[error("json error: {0}")]
    #[diagnostic(code(flowgraph::node::serde_json))]
    Serde(#[from] serde_json::Error),

    #[error("validation failed: {0}")]
    #[diagnostic(code(flowgraph::node::validation))]
    ValidationFailed(String),

    #[error("operation canceled")]
    #[diagnostic(code(flowgraph::node::canceled))]
    Canceled,
}
