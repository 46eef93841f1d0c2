//! Chat messages exchanged between the user, the model, and tool calls.

use serde::{Deserialize, Serialize};

use crate::types::Role;

/// A single turn in the conversation transcript (`messages`, §3.1).
///
/// Invariant (v): every message carries one of the four roles in [`Role`];
/// this is enforced at the type level rather than by runtime validation.
///
/// # Examples
///
/// ```
/// use flowgraph::message::ChatMessage;
///
/// let user_msg = ChatMessage::user("What is the weather?");
/// let assistant_msg = ChatMessage::assistant("It's sunny today!");
/// assert!(user_msg.has_role(flowgraph::types::Role::User));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}
