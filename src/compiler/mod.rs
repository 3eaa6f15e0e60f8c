//! Boundary to the external JavaScript compiler.
//!
//! The harness only depends on `Compiler::compile` and `Compiler::input_root`.
//! `CompilerFactory` hands out a fresh instance for every measured invocation.

pub mod closure;
pub mod mock;
pub mod traits;

// Re-export key types
pub use closure::{ClosureCompiler, ClosureCompilerFactory, ClosureConfig};
pub use mock::{MockCompiler, MockCompilerFactory, MockConfig, RecordedCompile};
pub use traits::{
    CompileOutcome, Compiler, CompilerFactory, Diagnostic, InputId, Severity, SourceUnit,
    SyntaxRoot,
};
