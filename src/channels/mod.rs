//! One file per state channel (§3.1), each holding that channel's reducer.
//! Mirrors the teacher's one-reducer-per-file layout (`reducers/map_merge.rs`).

mod memory_refs;
mod messages;
mod metadata;
mod scalars;
mod todos;

pub use memory_refs::DedupeMemoryRefs;
pub use messages::AppendMessages;
pub use metadata::ReplaceMetadata;
pub use scalars::LastWinsScalars;
pub use todos::MergeTodosById;
