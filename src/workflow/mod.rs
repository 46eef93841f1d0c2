//! The workflow model, validator, and store (§3.2, §4.5, §6.3): the
//! serializable graph the editor produces and the compiler (§4.6)
//! consumes.

pub mod model;
pub mod store;
pub mod templates;
pub mod validator;

pub use model::{Edge, NodeInstance, Position, WorkflowDefinition, DEFAULT_PORT, END_NODE_TYPE, START_NODE_TYPE};
pub use store::{StoreError, WorkflowStore};
pub use validator::validate;
