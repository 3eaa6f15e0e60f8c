//! Mock compiler for testing and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::pipeline::PipelineConfig;
use crate::{BenchError, BenchResult};

use super::traits::{
    CompileOutcome, Compiler, CompilerFactory, Diagnostic, InputId, SourceUnit, SyntaxRoot,
};

/// Configuration for mock compiler responses.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Name to report
    pub name: String,
    /// Version to report
    pub version: Option<String>,
    /// Errors every compile reports
    pub errors: Vec<Diagnostic>,
    /// Warnings every compile reports
    pub warnings: Vec<Diagnostic>,
    /// Type to attach to every root
    pub root_type: Option<String>,
    /// Whether compile should fail
    pub compile_fails: bool,
    /// Keep a `RecordedCompile` per call, readable through
    /// `MockCompilerFactory::recorded`
    pub record_calls: bool,
}

impl MockConfig {
    /// Create a new mock config with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        MockConfig {
            name: name.into(),
            version: Some("mock-1.0.0".to_string()),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, error: Diagnostic) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_warning(mut self, warning: Diagnostic) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn with_root_type(mut self, js_type: impl Into<String>) -> Self {
        self.root_type = Some(js_type.into());
        self
    }

    /// Make compile fail.
    pub fn compile_fails(mut self) -> Self {
        self.compile_fails = true;
        self
    }

    pub fn recording(mut self) -> Self {
        self.record_calls = true;
        self
    }
}

/// What one mock instance was asked to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCompile {
    pub externs: Vec<String>,
    pub sources: Vec<String>,
    pub config: PipelineConfig,
}

/// Hands out `MockCompiler`s and records every compile they perform.
#[derive(Debug, Clone)]
pub struct MockCompilerFactory {
    config: MockConfig,
    log: Arc<Mutex<Vec<RecordedCompile>>>,
}

impl MockCompilerFactory {
    pub fn new(config: MockConfig) -> Self {
        MockCompilerFactory {
            config,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock factory with default configuration. Records nothing.
    pub fn default_mock() -> Self {
        Self::new(MockConfig::new("mock"))
    }

    /// Default configuration with call recording on.
    pub fn recording() -> Self {
        Self::new(MockConfig::new("mock").recording())
    }

    /// Snapshot of compiles performed so far, in call order. Always empty
    /// unless the config has `record_calls` set.
    pub fn recorded(&self) -> Vec<RecordedCompile> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

impl CompilerFactory for MockCompilerFactory {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn version(&self) -> Option<String> {
        self.config.version.clone()
    }

    fn create(&self) -> Box<dyn Compiler> {
        Box::new(MockCompiler {
            config: self.config.clone(),
            log: Arc::clone(&self.log),
            options: None,
            compiled: false,
            roots: HashMap::new(),
        })
    }
}

/// In-process stand-in for the real compiler.
///
/// Splits each source on `;` to build a flat root, reports the configured
/// diagnostics, and refuses a second `compile` on the same instance.
pub struct MockCompiler {
    config: MockConfig,
    log: Arc<Mutex<Vec<RecordedCompile>>>,
    options: Option<PipelineConfig>,
    compiled: bool,
    roots: HashMap<InputId, SyntaxRoot>,
}

impl Compiler for MockCompiler {
    fn init_options(&mut self, config: &PipelineConfig) {
        self.options = Some(config.clone());
    }

    fn compile(
        &mut self,
        externs: &[SourceUnit],
        sources: &[SourceUnit],
        config: &PipelineConfig,
    ) -> BenchResult<CompileOutcome> {
        if self.compiled {
            return Err(BenchError::Compile("mock compiler instance reused".into()));
        }
        self.compiled = true;
        if self.config.compile_fails {
            return Err(BenchError::Compile("mock compile failed".into()));
        }
        if self.options.as_ref() != Some(config) {
            return Err(BenchError::Compile(
                "options passed to compile differ from init_options".into(),
            ));
        }

        for unit in sources {
            let mut root = SyntaxRoot::new(unit.id.clone());
            root.js_type = self.config.root_type.clone();
            root.statements = unit
                .text
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!("{s};"))
                .collect();
            self.roots.insert(unit.id.clone(), root);
        }

        if self.config.record_calls {
            if let Ok(mut log) = self.log.lock() {
                log.push(RecordedCompile {
                    externs: externs.iter().map(|u| u.name().to_string()).collect(),
                    sources: sources.iter().map(|u| u.name().to_string()).collect(),
                    config: config.clone(),
                });
            }
        }

        Ok(CompileOutcome {
            errors: self.config.errors.clone(),
            warnings: self.config.warnings.clone(),
            peak_rss_bytes: None,
        })
    }

    fn input_root(&self, id: &InputId) -> Option<&SyntaxRoot> {
        self.roots.get(id)
    }

    fn input_root_mut(&mut self, id: &InputId) -> Option<&mut SyntaxRoot> {
        self.roots.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Mode, build_config};

    fn compile_once(factory: &MockCompilerFactory, text: &str) -> Box<dyn Compiler> {
        let cfg = build_config(Mode::Legacy);
        let mut compiler = factory.create();
        compiler.init_options(&cfg);
        compiler
            .compile(&[], &[SourceUnit::from_code("a.js", text)], &cfg)
            .unwrap();
        compiler
    }

    #[test]
    fn test_mock_factory_default() {
        let factory = MockCompilerFactory::default_mock();
        assert_eq!(factory.name(), "mock");
        assert!(factory.version().is_some());
    }

    #[test]
    fn test_mock_root_statements() {
        let factory = MockCompilerFactory::default_mock();
        let compiler = compile_once(&factory, "var x = 1; var y = 2;\n");
        let root = compiler.input_root(&InputId::new("a.js")).unwrap();
        assert_eq!(root.statements, vec!["var x = 1;", "var y = 2;"]);
        assert!(root.js_type().is_none());
        assert!(compiler.input_root(&InputId::new("b.js")).is_none());
    }

    #[test]
    fn test_mock_rejects_reuse() {
        let factory = MockCompilerFactory::default_mock();
        let cfg = build_config(Mode::Legacy);
        let mut compiler = compile_once(&factory, "var x = 1;");
        let again = compiler.compile(&[], &[SourceUnit::from_code("a.js", "")], &cfg);
        assert!(matches!(again, Err(BenchError::Compile(_))));
    }

    #[test]
    fn test_mock_requires_matching_options() {
        let factory = MockCompilerFactory::default_mock();
        let mut compiler = factory.create();
        compiler.init_options(&build_config(Mode::Legacy));
        let result = compiler.compile(&[], &[], &build_config(Mode::ModernToLegacy));
        assert!(result.is_err());
    }

    #[test]
    fn test_mock_reports_configured_diagnostics() {
        let factory = MockCompilerFactory::new(
            MockConfig::new("mock")
                .with_error(Diagnostic::error("parse error"))
                .with_warning(Diagnostic::warning("unused var")),
        );
        let cfg = build_config(Mode::Legacy);
        let mut compiler = factory.create();
        compiler.init_options(&cfg);
        let outcome = compiler.compile(&[], &[], &cfg).unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_default_mock_records_nothing() {
        let factory = MockCompilerFactory::default_mock();
        compile_once(&factory, "var x = 1;");
        assert!(factory.recorded().is_empty());
    }

    #[test]
    fn test_mock_records_calls() {
        let factory = MockCompilerFactory::recording();
        compile_once(&factory, "var x = 1;");
        compile_once(&factory, "var y = 1;");
        let calls = factory.recorded();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].sources, vec!["a.js"]);
        assert!(calls[0].externs.is_empty());
    }

    #[test]
    fn test_mock_compile_fails() {
        let factory =
            MockCompilerFactory::new(MockConfig::new("mock").compile_fails().recording());
        let cfg = build_config(Mode::Legacy);
        let mut compiler = factory.create();
        compiler.init_options(&cfg);
        assert!(compiler.compile(&[], &[], &cfg).is_err());
        assert!(factory.recorded().is_empty());
    }
}
