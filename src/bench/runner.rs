//! The two measured entry points.
//!
//! Every invocation builds its own options and compiler instance. Nothing is
//! carried from one invocation to the next, so compiler-internal caching
//! cannot leak into later timings.

use std::hint::black_box;

use tracing::trace;

use crate::compiler::{CompileOutcome, Compiler, CompilerFactory, Diagnostic, InputId, SyntaxRoot};
use crate::pipeline::{Mode, build_config};
use crate::{BenchError, BenchResult};

use super::context::BenchContext;

pub struct Runner {
    context: BenchContext,
    factory: Box<dyn CompilerFactory>,
}

/// Everything one invocation produced. Owns its compiler instance.
pub struct Invocation {
    mode: Mode,
    input: InputId,
    outcome: CompileOutcome,
    compiler: Box<dyn Compiler>,
}

impl Invocation {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.outcome.errors
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.outcome.warnings
    }

    /// Peak RSS of the compiler process, when it ran out of process.
    pub fn peak_rss_bytes(&self) -> Option<u64> {
        self.outcome.peak_rss_bytes
    }

    pub fn root(&self) -> Option<&SyntaxRoot> {
        self.compiler.input_root(&self.input)
    }

    pub fn root_mut(&mut self) -> Option<&mut SyntaxRoot> {
        self.compiler.input_root_mut(&self.input)
    }
}

impl Runner {
    pub fn new(context: BenchContext, factory: Box<dyn CompilerFactory>) -> Self {
        Runner { context, factory }
    }

    pub fn context(&self) -> &BenchContext {
        &self.context
    }

    pub fn factory(&self) -> &dyn CompilerFactory {
        self.factory.as_ref()
    }

    /// ES5 input, no transpilation, no externs.
    pub fn run_legacy(&self) -> BenchResult<()> {
        self.run(Mode::Legacy)
    }

    /// ES6 input transpiled to ES5 against the resolved externs.
    pub fn run_modern_to_legacy(&self) -> BenchResult<()> {
        self.run(Mode::ModernToLegacy)
    }

    pub fn run(&self, mode: Mode) -> BenchResult<()> {
        black_box(self.invoke(mode)?);
        Ok(())
    }

    /// One full compile for `mode`, returning the diagnostics and tree so
    /// callers can inspect them.
    pub fn invoke(&self, mode: Mode) -> BenchResult<Invocation> {
        let config = build_config(mode);
        let mut compiler = self.factory.create();
        compiler.init_options(&config);

        let sources = [self.context.source_for(mode)];
        let externs = self.context.externs().units_for(mode);
        let outcome = compiler.compile(externs, &sources, &config)?;

        let input = sources[0].id.clone();
        let root = compiler
            .input_root(&input)
            .ok_or_else(|| BenchError::Compile(format!("no syntax root for input {input}")))?;
        black_box(root.js_type());
        trace!(
            %mode,
            errors = outcome.errors.len(),
            warnings = outcome.warnings.len(),
            "invocation complete"
        );

        Ok(Invocation {
            mode,
            input,
            outcome,
            compiler,
        })
    }
}
