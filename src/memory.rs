//! The memory manager capability (§6.2): long-term memory persistence
//! internals are out of scope (§1); consumed only through this trait.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::types::Role;

/// One memory entry returned by a search.
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryEntry {
    pub filename: String,
    pub source: String,
    pub char_count: usize,
}

/// A scored search hit.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub entry: MemoryEntry,
    pub score: f64,
}

/// Memory errors are always non-fatal (§7: "always non-fatal; logged at
/// debug and swallowed"), but still typed so callers can choose to log.
#[derive(Debug, Error, Diagnostic)]
pub enum MemoryError {
    #[error("memory backend unavailable: {0}")]
    #[diagnostic(code(flowgraph::memory::unavailable))]
    Unavailable(String),
}

#[async_trait]
pub trait MemoryManager: Send + Sync {
    async fn initialize(&self) -> Result<(), MemoryError>;

    /// Records a short-term transcript entry.
    async fn record_message(&self, role: Role, content: &str) -> Result<(), MemoryError>;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, MemoryError>;

    /// Flushes short-term transcript entries into long-term storage.
    async fn auto_flush(&self) -> Result<(), MemoryError>;
}

/// Test-only in-memory manager (§6 [EXPANDED]).
#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryMemoryManager {
        transcript: Mutex<Vec<(Role, String)>>,
        corpus: Vec<MemoryEntry>,
    }

    impl InMemoryMemoryManager {
        #[must_use]
        pub fn new(corpus: Vec<MemoryEntry>) -> Self {
            Self {
                transcript: Mutex::new(Vec::new()),
                corpus,
            }
        }

        pub fn transcript(&self) -> Vec<(Role, String)> {
            self.transcript.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MemoryManager for InMemoryMemoryManager {
        async fn initialize(&self) -> Result<(), MemoryError> {
            Ok(())
        }

        async fn record_message(&self, role: Role, content: &str) -> Result<(), MemoryError> {
            self.transcript.lock().unwrap().push((role, content.to_string()));
            Ok(())
        }

        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, MemoryError> {
            let query = query.to_ascii_lowercase();
            let mut hits: Vec<SearchResult> = self
                .corpus
                .iter()
                .filter(|e| e.source.to_ascii_lowercase().contains(&query) || query.is_empty())
                .map(|e| SearchResult {
                    entry: e.clone(),
                    score: 1.0,
                })
                .collect();
            hits.truncate(max_results);
            Ok(hits)
        }

        async fn auto_flush(&self) -> Result<(), MemoryError> {
            Ok(())
        }
    }
}
