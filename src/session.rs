//! The session façade (§4.8): owns one session's `ModelAdapter`,
//! `MemoryManager`, compiled graph, and metadata, and serializes that
//! session's invocations. Grounded in the teacher's `App`
//! (`app.rs`, construction/ownership shape) and `runtimes/session.rs`
//! (the session-state-as-data-struct convention), generalized from the
//! teacher's graph-only ownership to also own the two external
//! capabilities a session needs (§6.1, §6.2).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::adapter::ModelAdapter;
use crate::compiler::{self, CompiledGraph, CompileError};
use crate::event_bus::{EventBus, EventEmitter, EventStream};
use crate::executor::{CancellationToken, Executor, RunnerError};
use crate::memory::MemoryManager;
use crate::node::NodeContext;
use crate::registry::NodeRegistry;
use crate::workflow::{StoreError, WorkflowStore};

/// `manager`/`worker` per §6.5/§9 Open Questions: purely informational
/// metadata, no delegation logic lives here or anywhere else in the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionRole {
    #[default]
    Manager,
    Worker,
}

/// Per-session configuration surface (§6.5): passed in at creation time as
/// a typed struct, never read ad hoc from the environment inside the core
/// (only the model adapter's own process may consult its environment).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub session_name: String,
    pub working_dir: Option<String>,
    pub model_name: String,
    pub max_turns: Option<u32>,
    pub timeout: Duration,
    pub max_iterations: u32,
    pub system_prompt: Option<String>,
    pub allowed_tools: Option<Vec<String>>,
    pub workflow_id: Option<String>,
    pub graph_name: Option<String>,
    pub mcp_config: Option<serde_json::Value>,
    pub role: SessionRole,
    pub manager_id: Option<String>,
    pub env_vars: Vec<(String, String)>,
    pub max_retries: u32,
    /// Freshness thresholds (§4.8 "Freshness policy"). Not named in the
    /// §6.5 table, which only lists per-invocation budgets; these bound
    /// the session's overall lifetime and are given generous defaults
    /// (see [`SessionConfig::default_freshness`]).
    pub max_age: Duration,
    pub max_idle: Duration,
}

impl SessionConfig {
    const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
    const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(30 * 60);

    #[must_use]
    pub fn new(session_name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            working_dir: None,
            model_name: model_name.into(),
            max_turns: None,
            timeout: Duration::from_secs(120),
            max_iterations: 25,
            system_prompt: None,
            allowed_tools: None,
            workflow_id: None,
            graph_name: None,
            mcp_config: None,
            role: SessionRole::Manager,
            manager_id: None,
            env_vars: Vec::new(),
            max_retries: 2,
            max_age: Self::DEFAULT_MAX_AGE,
            max_idle: Self::DEFAULT_MAX_IDLE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Initializing,
    Active,
    Error,
    Closed,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("session {0} is stale and has been marked errored")]
    #[diagnostic(
        code(flowgraph::session::stale),
        help("Create a new session; this one exceeded its age, idle, or iteration budget.")
    )]
    Stale(String),

    #[error("session {0} is closed")]
    #[diagnostic(code(flowgraph::session::closed))]
    Closed(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Runner(#[from] RunnerError),
}

/// Serializable snapshot returned by [`SessionFacade::session_info`] (§4.8).
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub name: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub role: &'static str,
    pub workflow_id: Option<String>,
    pub total_iterations: u64,
}

struct Activity {
    status: SessionStatus,
    created_at: DateTime<Utc>,
    started_at: Instant,
    last_active: Instant,
    total_iterations: u64,
}

/// Owns one session's adapter, memory manager, compiled graph, and
/// metadata (§4.8). `invoke`/`stream` are serialized by `&mut self` at the
/// call site's discretion — per §5, "invocations are serialized by the
/// session façade (only one active invocation at a time)" — callers are
/// expected to hold one `SessionFacade` behind a single-owner handle (e.g.
/// an `Arc<tokio::sync::Mutex<SessionFacade>>`) rather than this type
/// enforcing it internally.
pub struct SessionFacade {
    id: String,
    config: SessionConfig,
    model: Arc<dyn ModelAdapter>,
    memory: Arc<dyn MemoryManager>,
    workflow_id: String,
    graph: Arc<CompiledGraph>,
    executor: Executor,
    bus: Arc<EventBus>,
    activity: Mutex<Activity>,
}

impl SessionFacade {
    /// Acquires the adapter, initializes memory, resolves and compiles the
    /// workflow (§4.8: "load the `WorkflowDefinition` (by `workflowId`, else
    /// by template hint derived from `graphName`, else fallback template
    /// `simple`), compile").
    #[instrument(skip(config, model, memory, store, registry))]
    pub async fn initialize(
        config: SessionConfig,
        model: Arc<dyn ModelAdapter>,
        memory: Arc<dyn MemoryManager>,
        store: &WorkflowStore,
        registry: &NodeRegistry,
    ) -> Result<Self, SessionError> {
        memory.initialize().await.ok();

        let definition = match &config.workflow_id {
            Some(id) => store.load(id)?,
            None => match &config.graph_name {
                Some(name) => store.load_by_template_name(name)?,
                None => store.load_by_template_name("simple")?,
            },
        };
        let workflow_id = definition.id.clone();
        let graph = Arc::new(compiler::compile(&definition, registry)?);
        let bus = Arc::new(EventBus::default());
        let executor = Executor::new(Arc::clone(&graph), bus.get_emitter());

        let now = Instant::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            config,
            model,
            memory,
            workflow_id,
            graph,
            executor,
            bus,
            activity: Mutex::new(Activity {
                status: SessionStatus::Active,
                created_at: Utc::now(),
                started_at: now,
                last_active: now,
                total_iterations: 0,
            }),
        })
    }

    fn check_freshness(&self) -> Result<(), SessionError> {
        let mut activity = self.activity.lock();
        if activity.status == SessionStatus::Closed {
            return Err(SessionError::Closed(self.id.clone()));
        }
        if activity.status == SessionStatus::Error {
            return Err(SessionError::Stale(self.id.clone()));
        }
        let stale = activity.started_at.elapsed() > self.config.max_age
            || activity.last_active.elapsed() > self.config.max_idle
            || u32::try_from(activity.total_iterations).unwrap_or(u32::MAX) > self.config.max_iterations;
        if stale {
            activity.status = SessionStatus::Error;
            return Err(SessionError::Stale(self.id.clone()));
        }
        Ok(())
    }

    fn node_context(&self) -> NodeContext {
        NodeContext::new(
            self.id.clone(),
            Arc::clone(&self.model),
            Arc::clone(&self.memory),
            self.config.max_retries,
            self.config.model_name.clone(),
        )
    }

    fn record_activity(&self, iterations: u32) {
        let mut activity = self.activity.lock();
        activity.last_active = Instant::now();
        activity.total_iterations += u64::from(iterations);
    }

    /// `invoke(input)` (§4.8, §7 "User-visible failure behavior"). Checks
    /// freshness first; a node-execution failure is not propagated as a
    /// Rust error here — it is folded into the `"Error: <message>"` string
    /// the way a stream consumer would see it via `stopReason`, so the
    /// session remains usable exactly as §7 specifies ("The session remains
    /// usable unless the freshness evaluator or cleanup has retired it.").
    /// Only staleness/closure refuse outright.
    pub async fn invoke(&self, input: impl Into<String>) -> Result<String, SessionError> {
        self.check_freshness()?;
        let ctx = self.node_context();
        let cancellation = CancellationToken::new();
        let input = input.into();
        match self.executor.invoke_full(input, &ctx, self.config.max_iterations, cancellation).await {
            Ok(state) => {
                self.record_activity(state.scalars.iteration);
                match &state.scalars.error {
                    Some(message) => Ok(format!("Error: {message}")),
                    None => Ok(state.resolved_output().unwrap_or_default().to_string()),
                }
            }
            Err(err) => {
                self.record_activity(0);
                Ok(format!("Error: {err}"))
            }
        }
    }

    /// `stream(input)` (§4.8, §6.4): subscribes to the event bus before
    /// spawning the run so no event is lost to a race between subscription
    /// and the first `enter` event, then runs the executor in the
    /// background. The returned handle resolves once the run completes;
    /// the stream itself yields every event as it is emitted.
    pub async fn stream(
        &self,
        input: impl Into<String>,
    ) -> Result<(EventStream, tokio::task::JoinHandle<Result<String, RunnerError>>), SessionError> {
        self.check_freshness()?;
        let events = self.bus.subscribe();
        let executor = self.executor.clone();
        let ctx = self.node_context();
        let cancellation = CancellationToken::new();
        let max_iterations = self.config.max_iterations;
        let input = input.into();
        let handle = tokio::spawn(async move { executor.invoke(input, &ctx, max_iterations, cancellation).await });
        Ok((events, handle))
    }

    /// Flushes the transcript to long-term memory, releases the adapter,
    /// and drops the graph (§4.8). Best-effort: memory flush runs even if
    /// the session was already stale (§5: "Memory flush on cleanup runs
    /// even after cancellation (best-effort, bounded).").
    pub async fn cleanup(&mut self) {
        if let Err(err) = self.memory.auto_flush().await {
            tracing::debug!(error = %err, session_id = %self.id, "memory flush on cleanup failed (non-fatal)");
        }
        self.model.cleanup().await;
        self.activity.lock().status = SessionStatus::Closed;
    }

    #[must_use]
    pub fn session_info(&self) -> SessionInfo {
        let activity = self.activity.lock();
        SessionInfo {
            id: self.id.clone(),
            name: self.config.session_name.clone(),
            status: activity.status,
            created_at: activity.created_at,
            model: self.config.model_name.clone(),
            role: match self.config.role {
                SessionRole::Manager => "manager",
                SessionRole::Worker => "worker",
            },
            workflow_id: Some(self.workflow_id.clone()),
            total_iterations: activity.total_iterations,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}
