//! Closure Compiler backend: runs `java -jar closure-compiler.jar` once per
//! compile and reads JSON diagnostics and output streams back.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::core::env::RssSampler;
use crate::pipeline::PipelineConfig;
use crate::{BenchError, BenchResult};

use super::traits::{
    CompileOutcome, Compiler, CompilerFactory, Diagnostic, InputId, Severity, SourceUnit,
    SyntaxRoot,
};

const SAMPLE_INTERVAL: Duration = Duration::from_millis(5);

/// Configuration for the Closure Compiler backend.
#[derive(Debug, Clone)]
pub struct ClosureConfig {
    /// Path to the java binary
    pub java_path: PathBuf,
    /// Path to closure-compiler.jar
    pub jar_path: PathBuf,
    /// Extra arguments appended after the generated flags
    pub extra_args: Vec<String>,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        ClosureConfig {
            java_path: PathBuf::from("java"),
            jar_path: PathBuf::from("closure-compiler.jar"),
            extra_args: Vec::new(),
        }
    }
}

impl ClosureConfig {
    /// Create a new config with the given jar path.
    pub fn new(jar_path: impl Into<PathBuf>) -> Self {
        ClosureConfig {
            jar_path: jar_path.into(),
            ..Default::default()
        }
    }

    pub fn with_java(mut self, java_path: impl Into<PathBuf>) -> Self {
        self.java_path = java_path.into();
        self
    }

    /// Add extra arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}

/// Hands out one `ClosureCompiler` per measured invocation.
#[derive(Debug, Clone)]
pub struct ClosureCompilerFactory {
    config: ClosureConfig,
}

impl ClosureCompilerFactory {
    pub fn new(config: ClosureConfig) -> Self {
        ClosureCompilerFactory { config }
    }

    fn detect_version(&self) -> Option<String> {
        Command::new(&self.config.java_path)
            .arg("-jar")
            .arg(&self.config.jar_path)
            .arg("--version")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|s| parse_version(&s))
    }
}

impl CompilerFactory for ClosureCompilerFactory {
    fn name(&self) -> &str {
        "closure"
    }

    fn version(&self) -> Option<String> {
        self.detect_version()
    }

    fn create(&self) -> Box<dyn Compiler> {
        Box::new(ClosureCompiler {
            config: self.config.clone(),
            options: None,
            roots: HashMap::new(),
        })
    }
}

/// Extract `vYYYYMMDD` from `--version` output ("Version: v20240317").
pub fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Version:"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct ClosureCompiler {
    config: ClosureConfig,
    options: Option<PipelineConfig>,
    roots: HashMap<InputId, SyntaxRoot>,
}

/// Command-line flags for one compile.
///
/// `record_function_information` has no command-line counterpart and is not
/// forwarded.
pub fn build_args(config: &PipelineConfig, externs: &[PathBuf], sources: &[PathBuf]) -> Vec<String> {
    let mut args = vec![
        format!("--language_in={}", config.language_in.as_flag()),
        format!(
            "--language_out={}",
            config.language_out.map(|m| m.as_flag()).unwrap_or("NO_TRANSPILE")
        ),
        "--env=CUSTOM".to_string(),
        "--warning_level=VERBOSE".to_string(),
        "--error_format=JSON".to_string(),
        "--json_streams=OUT".to_string(),
    ];
    if config.ide_mode {
        args.push("--checks_only".to_string());
    }
    if config.parse_jsdoc_documentation {
        let parsing = if config.preserve_jsdoc_whitespace {
            "INCLUDE_DESCRIPTIONS_WITH_WHITESPACE"
        } else {
            "INCLUDE_DESCRIPTIONS_NO_WHITESPACE"
        };
        args.push(format!("--jsdoc_parsing={parsing}"));
    }
    for path in externs {
        args.push(format!("--externs={}", path.display()));
    }
    for path in sources {
        args.push(format!("--js={}", path.display()));
    }
    args
}

#[derive(Debug, Deserialize)]
struct RawDiagnostic {
    level: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    line: Option<u32>,
}

/// Byte offset of the first line that opens a JSON array of objects (or an
/// empty one). Launcher notices such as `[0.012s][warning][gc]` or
/// `Picked up _JAVA_OPTIONS: -Xlog:gc*[utc]` are skipped.
fn json_array_start(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('[') {
            if matches!(rest.trim_start().chars().next(), None | Some('{') | Some(']')) {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Parse `--error_format=JSON` output. Lines around the JSON array (JVM
/// notices) are skipped; "info" entries are dropped.
pub fn parse_diagnostics(stderr: &str) -> BenchResult<CompileOutcome> {
    let mut outcome = CompileOutcome::default();
    let Some(start) = json_array_start(stderr) else {
        return Ok(outcome);
    };
    let raw = serde_json::Deserializer::from_str(&stderr[start..])
        .into_iter::<Vec<RawDiagnostic>>()
        .next()
        .unwrap_or_else(|| Ok(Vec::new()))
        .map_err(|e| BenchError::Compile(format!("failed to parse diagnostics: {e}")))?;
    for d in raw {
        let severity = match d.level.as_str() {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            _ => continue,
        };
        let diagnostic = Diagnostic {
            severity,
            message: d.description,
            key: d.key,
            source: d.source,
            line: d.line,
        };
        match severity {
            Severity::Error => outcome.errors.push(diagnostic),
            Severity::Warning => outcome.warnings.push(diagnostic),
        }
    }
    Ok(outcome)
}

#[derive(Debug, Deserialize)]
struct OutputFile {
    #[serde(default)]
    src: String,
}

/// Parse `--json_streams=OUT` output into the emitted lines. Empty output
/// (nothing emitted) yields no lines.
pub fn parse_output(stdout: &str) -> BenchResult<Vec<String>> {
    let Some(start) = json_array_start(stdout) else {
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        return Err(BenchError::Compile("output stream is not a JSON array".into()));
    };
    let files = serde_json::Deserializer::from_str(&stdout[start..])
        .into_iter::<Vec<OutputFile>>()
        .next()
        .unwrap_or_else(|| Ok(Vec::new()))
        .map_err(|e| BenchError::Compile(format!("failed to parse output stream: {e}")))?;
    Ok(files
        .iter()
        .flat_map(|f| f.src.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Drain a child pipe on its own thread so the child never blocks on a
/// full pipe while it is being sampled.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(handle: JoinHandle<std::io::Result<Vec<u8>>>, stream: &str) -> BenchResult<Vec<u8>> {
    handle
        .join()
        .map_err(|_| BenchError::Compile(format!("{stream} reader panicked")))?
        .map_err(|e| BenchError::Compile(format!("failed to read {stream}: {e}")))
}

struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    peak_rss_bytes: Option<u64>,
}

/// Run `cmd` to completion, sampling the child's RSS until it exits.
fn run_sampled(mut cmd: Command) -> BenchResult<Finished> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BenchError::Compile(format!("failed to spawn java: {e}")))?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let mut sampler = RssSampler::new(child.id());
    let status = loop {
        sampler.sample();
        let exited = child
            .try_wait()
            .map_err(|e| BenchError::Compile(format!("failed to wait for java: {e}")))?;
        if let Some(status) = exited {
            break status;
        }
        std::thread::sleep(SAMPLE_INTERVAL);
    };

    Ok(Finished {
        status,
        stdout: collect(stdout, "stdout")?,
        stderr: collect(stderr, "stderr")?,
        peak_rss_bytes: sampler.peak_bytes(),
    })
}

fn write_units(dir: &Path, prefix: &str, units: &[SourceUnit]) -> BenchResult<Vec<PathBuf>> {
    units
        .iter()
        .enumerate()
        .map(|(i, unit)| -> BenchResult<PathBuf> {
            // Index prefix keeps same-named units apart on disk.
            let path = dir.join(format!("{prefix}{i}_{}", unit.name()));
            std::fs::write(&path, unit.text.as_bytes())
                .map_err(|e| BenchError::Compile(format!("failed to stage {}: {e}", unit.name())))?;
            Ok(path)
        })
        .collect()
}

impl Compiler for ClosureCompiler {
    fn init_options(&mut self, config: &PipelineConfig) {
        self.options = Some(config.clone());
    }

    fn compile(
        &mut self,
        externs: &[SourceUnit],
        sources: &[SourceUnit],
        config: &PipelineConfig,
    ) -> BenchResult<CompileOutcome> {
        let options = self.options.get_or_insert_with(|| config.clone()).clone();
        let work_dir = tempfile::tempdir()
            .map_err(|e| BenchError::Compile(format!("failed to create temp dir: {e}")))?;
        let extern_paths = write_units(work_dir.path(), "externs_", externs)?;
        let source_paths = write_units(work_dir.path(), "src_", sources)?;

        let mut cmd = Command::new(&self.config.java_path);
        cmd.arg("-jar")
            .arg(&self.config.jar_path)
            .args(build_args(&options, &extern_paths, &source_paths))
            .args(&self.config.extra_args)
            .stdin(Stdio::null());
        debug!(?cmd, "running closure compiler");

        let output = run_sampled(cmd)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut outcome = parse_diagnostics(&stderr)?;
        if !output.status.success() && outcome.errors.is_empty() {
            return Err(BenchError::Compile(format!(
                "closure compiler failed: status={} stderr={}",
                output.status,
                stderr.trim()
            )));
        }
        outcome.peak_rss_bytes = output.peak_rss_bytes;

        let emitted = parse_output(&String::from_utf8_lossy(&output.stdout))?;
        self.roots.clear();
        for unit in sources {
            let mut root = SyntaxRoot::new(unit.id.clone());
            root.statements = emitted.clone();
            self.roots.insert(unit.id.clone(), root);
        }
        Ok(outcome)
    }

    fn input_root(&self, id: &InputId) -> Option<&SyntaxRoot> {
        self.roots.get(id)
    }

    fn input_root_mut(&mut self, id: &InputId) -> Option<&mut SyntaxRoot> {
        self.roots.get_mut(id)
    }
}
