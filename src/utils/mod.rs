//! Small, dependency-free JSON helpers shared across reducers and nodes.

pub mod json_ext;
