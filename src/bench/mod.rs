//! Benchmark runner: context initialisation, the measured entry points and
//! the iteration loop around them.

pub mod config;
pub mod context;
pub mod measure;
pub mod runner;

pub use config::{HarnessConfig, load_harness_config};
pub use context::BenchContext;
pub use measure::{MeasureOptions, measure, measure_with_env};
pub use runner::{Invocation, Runner};
