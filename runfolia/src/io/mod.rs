//! I/O stages of the pipeline.

pub mod config;
pub mod discover;
pub mod fetch;
pub mod index;
pub mod paths;
pub mod process;
pub mod stage;
