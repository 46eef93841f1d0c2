//! Small, copyable domain enums shared across the state model, nodes, and
//! the structured-output layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification result produced by the Classify node (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Case-insensitive match against `{easy, medium, hard}`, defaulting to
    /// `medium` per the Classify node contract.
    pub fn parse_or_medium(raw: &str) -> Self {
        let trimmed = raw.trim().to_ascii_lowercase();
        if trimmed.contains("easy") {
            Difficulty::Easy
        } else if trimmed.contains("hard") {
            Difficulty::Hard
        } else {
            Difficulty::Medium
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(s)
    }
}

/// Review verdict. Per spec.md §9 Open Questions, treated as a closed set —
/// the Review node only ever signals `Approved` or `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewResult {
    Approved,
    Rejected,
}

/// Parsed structured completion signal (Post Model node, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionSignal {
    #[default]
    None,
    Continue,
    Complete,
    Blocked,
    Error,
}

/// Status of a single TODO item. Per invariant (iii), progresses
/// monotonically except on explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Context-budget classification (Context Guard node, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    #[default]
    Ok,
    Warn,
    Block,
    Overflow,
}

impl BudgetStatus {
    pub fn is_blocking(self) -> bool {
        matches!(self, BudgetStatus::Block | BudgetStatus::Overflow)
    }
}

/// Message role. Invariant (v): every appended message has one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// Names of the state channels, used for reducer dispatch and event/log
/// labeling. Mirrors the teacher's `ChannelType`, generalized to this
/// state's five channels (§3.1 [EXPANDED]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelName {
    Messages,
    Todos,
    MemoryRefs,
    Metadata,
    Scalars,
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelName::Messages => "messages",
            ChannelName::Todos => "todos",
            ChannelName::MemoryRefs => "memory_refs",
            ChannelName::Metadata => "metadata",
            ChannelName::Scalars => "scalars",
        };
        f.write_str(s)
    }
}
