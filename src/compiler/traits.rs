//! Compiler trait and the value types that cross the collaborator boundary.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::BenchResult;
use crate::pipeline::PipelineConfig;

/// Identifier of one input unit, as passed to `Compiler::input_root`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputId(String);

impl InputId {
    pub fn new(name: impl Into<String>) -> Self {
        InputId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named JavaScript text handed to the compiler, either as an extern or a source.
///
/// The text is shared, so wrapping the fixture per iteration does not copy it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub id: InputId,
    pub text: Arc<str>,
}

impl SourceUnit {
    pub fn from_code(name: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        SourceUnit {
            id: InputId::new(name),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.id.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One error or warning reported by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            key: None,
            source: None,
            line: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }
}

/// Diagnostics from one `compile` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOutcome {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Peak resident set size of an out-of-process compiler, in bytes.
    /// `None` for compilers running inside the harness.
    pub peak_rss_bytes: Option<u64>,
}

/// Root of the syntax tree produced for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxRoot {
    pub input: InputId,
    /// Type annotated on the root, if the compiler attached one.
    pub js_type: Option<String>,
    /// Top-level statements, as source text.
    pub statements: Vec<String>,
}

impl SyntaxRoot {
    pub fn new(input: InputId) -> Self {
        SyntaxRoot {
            input,
            js_type: None,
            statements: Vec::new(),
        }
    }

    pub fn js_type(&self) -> Option<&str> {
        self.js_type.as_deref()
    }
}

/// One isolated compiler pipeline instance.
///
/// Instances are created per measured invocation and never reused; anything
/// they memoize dies with them.
pub trait Compiler: Send {
    /// Apply options before `compile`.
    fn init_options(&mut self, config: &PipelineConfig);

    /// Parse, check and (when `config.language_out` is set) transpile `sources`
    /// against `externs`.
    ///
    /// JavaScript errors are reported in the outcome; `Err` means the
    /// collaborator itself could not run.
    fn compile(
        &mut self,
        externs: &[SourceUnit],
        sources: &[SourceUnit],
        config: &PipelineConfig,
    ) -> BenchResult<CompileOutcome>;

    /// Syntax tree root for a source unit from the last `compile`.
    fn input_root(&self, id: &InputId) -> Option<&SyntaxRoot>;

    fn input_root_mut(&mut self, id: &InputId) -> Option<&mut SyntaxRoot>;
}

/// Creates fresh `Compiler` instances. Shared read-only across worker threads.
pub trait CompilerFactory: Send + Sync {
    /// Returns the compiler name (e.g., "closure", "mock").
    fn name(&self) -> &str;

    /// Returns the compiler version, if available.
    fn version(&self) -> Option<String>;

    fn create(&self) -> Box<dyn Compiler>;
}
