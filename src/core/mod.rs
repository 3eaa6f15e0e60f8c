//! Core types and schemas for jsparse-bench.
//!
//! This module contains the `BenchRecord` schema (v1) used for all benchmark outputs.

pub mod env;
pub mod schema;

// Re-export key types for convenience
pub use env::EnvironmentInfo;
pub use schema::{BenchRecord, CompilerInfo, RunConfig, SCHEMA_VERSION, TimingStat};
