//! Deterministic logic and value types shared by the pipeline stages.
//!
//! Core modules must be free of I/O side effects.

pub mod builds;
pub mod launch;
pub mod types;
