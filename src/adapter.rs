//! The model adapter capability (§6.1): the LLM subprocess and its stdio
//! protocol are out of scope for this crate (§1) and consumed only through
//! this trait. Modeled after the teacher's `Checkpointer` trait shape — an
//! async capability trait plus a trivial reference implementation for
//! tests (`mock`, §6 [EXPANDED]).

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::ChatMessage;

/// Options for a single model invocation.
#[derive(Clone, Debug, Default)]
pub struct InvokeOptions {
    pub timeout_ms: Option<u64>,
    pub system_prompt: Option<String>,
    pub skip_permissions: bool,
}

/// The model's response to one invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub stop_reason: String,
    pub cost_usd: Option<f64>,
    pub duration_ms: Option<u64>,
    pub num_turns: Option<u32>,
    pub model: Option<String>,
}

/// Process-level metadata about the adapter's subprocess.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdapterMetadata {
    pub session_id: String,
    pub model_name: String,
    pub working_dir: Option<String>,
    pub storage_path: Option<String>,
    pub pid: Option<u32>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum AdapterError {
    #[error("model invocation timed out after {0}ms")]
    #[diagnostic(code(flowgraph::adapter::timeout))]
    Timeout(u64),

    #[error("model subprocess failed: {0}")]
    #[diagnostic(code(flowgraph::adapter::subprocess))]
    Subprocess(String),

    #[error("model adapter not initialized")]
    #[diagnostic(code(flowgraph::adapter::not_initialized))]
    NotInitialized,
}

/// The LLM subprocess adapter. The core never signals processes directly
/// (§6.1) — it owns the subprocess lifecycle and exposes only `invoke`.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        options: InvokeOptions,
    ) -> Result<ModelResponse, AdapterError>;

    async fn cleanup(&self);

    fn is_initialized(&self) -> bool;

    fn metadata(&self) -> AdapterMetadata;
}

/// Test-only in-memory adapter (§6 [EXPANDED]), grounded in the teacher's
/// `InMemoryCheckpointer` pattern of shipping a trivial reference impl
/// alongside the capability trait it exercises.
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed script of responses, one per call; repeats the last
    /// response once the script is exhausted.
    pub struct ScriptedAdapter {
        responses: Mutex<Vec<String>>,
        cursor: Mutex<usize>,
    }

    impl ScriptedAdapter {
        #[must_use]
        pub fn new(responses: Vec<impl Into<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
                cursor: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelAdapter for ScriptedAdapter {
        async fn invoke(
            &self,
            _messages: &[ChatMessage],
            _options: InvokeOptions,
        ) -> Result<ModelResponse, AdapterError> {
            let responses = self.responses.lock().unwrap();
            let mut cursor = self.cursor.lock().unwrap();
            let idx = (*cursor).min(responses.len().saturating_sub(1));
            *cursor += 1;
            let content = responses.get(idx).cloned().unwrap_or_default();
            Ok(ModelResponse {
                content,
                stop_reason: "end_turn".to_string(),
                cost_usd: None,
                duration_ms: Some(1),
                num_turns: Some(1),
                model: Some("mock-model".to_string()),
            })
        }

        async fn cleanup(&self) {}

        fn is_initialized(&self) -> bool {
            true
        }

        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata {
                session_id: "mock-session".to_string(),
                model_name: "mock-model".to_string(),
                ..Default::default()
            }
        }
    }

    /// Always fails, for exercising resilience/fallback paths.
    pub struct FailingAdapter;

    #[async_trait]
    impl ModelAdapter for FailingAdapter {
        async fn invoke(
            &self,
            _messages: &[ChatMessage],
            _options: InvokeOptions,
        ) -> Result<ModelResponse, AdapterError> {
            Err(AdapterError::Subprocess("mock failure".to_string()))
        }

        async fn cleanup(&self) {}

        fn is_initialized(&self) -> bool {
            true
        }

        fn metadata(&self) -> AdapterMetadata {
            AdapterMetadata::default()
        }
    }
}
