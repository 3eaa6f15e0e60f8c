//! CLI command implementations.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::bench::{BenchContext, HarnessConfig, MeasureOptions, Runner, load_harness_config, measure_with_env};
use crate::compiler::{ClosureCompilerFactory, ClosureConfig, CompilerFactory, MockCompilerFactory};
use crate::core::{BenchRecord, EnvironmentInfo};
use crate::externs::resolve_externs;
use crate::fixture::HttpFetcher;
use crate::pipeline::Mode;
use crate::storage::JsonlWriter;
use crate::{BenchError, BenchResult};

/// Which compiler collaborator to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerChoice {
    Mock,
    Closure {
        jar: PathBuf,
        java: Option<PathBuf>,
        /// Appended verbatim to every compiler command line.
        flags: Vec<String>,
    },
}

impl CompilerChoice {
    /// Jar whose bundled externs the compiler expects, if any.
    pub fn jar(&self) -> Option<&Path> {
        match self {
            CompilerChoice::Mock => None,
            CompilerChoice::Closure { jar, .. } => Some(jar),
        }
    }
}

/// Command-line overrides layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub externs_archive: Option<PathBuf>,
    pub allow_missing_externs: bool,
    pub iterations: Option<usize>,
    pub warmup: Option<usize>,
    pub threads: Option<usize>,
}

impl Overrides {
    pub fn resolve(&self) -> BenchResult<HarnessConfig> {
        let mut cfg = load_harness_config(self.config.as_deref())?;
        if let Some(dir) = &self.cache_dir {
            cfg.fixture.cache_dir = dir.clone();
        }
        if let Some(archive) = &self.externs_archive {
            cfg.externs.archive = Some(archive.clone());
        }
        if self.allow_missing_externs {
            cfg.externs.allow_missing = true;
        }
        if let Some(n) = self.iterations {
            cfg.run.iterations = n;
        }
        if let Some(n) = self.warmup {
            cfg.run.warmup = n;
        }
        if let Some(n) = self.threads {
            cfg.run.threads = n;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> BenchResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| BenchError::Message(e.to_string()))?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| BenchError::Message(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| BenchError::Message(e.to_string()))
}

fn make_factory(choice: &CompilerChoice) -> Box<dyn CompilerFactory> {
    match choice {
        CompilerChoice::Mock => Box::new(MockCompilerFactory::default_mock()),
        CompilerChoice::Closure { jar, java, flags } => {
            let mut config = ClosureConfig::new(jar).with_args(flags.clone());
            if let Some(java) = java {
                config = config.with_java(java);
            }
            Box::new(ClosureCompilerFactory::new(config))
        }
    }
}

/// Initialise the context once, then measure each requested mode.
pub fn run(
    modes: Vec<Mode>,
    compiler: CompilerChoice,
    overrides: Overrides,
    json_out: Option<PathBuf>,
    jsonl_out: Option<PathBuf>,
) -> BenchResult<Vec<BenchRecord>> {
    let cfg = overrides.resolve()?;
    let archive = cfg.archive_source_with_jar(compiler.jar());
    let context = BenchContext::initialize(&cfg, &HttpFetcher, &archive)?;
    let env = match &compiler {
        CompilerChoice::Closure { java, .. } => {
            EnvironmentInfo::detect_with_java(java.as_deref().unwrap_or(Path::new("java")))
        }
        CompilerChoice::Mock => EnvironmentInfo::detect(),
    };
    let runner = Runner::new(context, make_factory(&compiler));
    let opts = MeasureOptions {
        warmup: cfg.run.warmup,
        iterations: cfg.run.iterations,
        threads: cfg.run.threads,
    };
    let cli_args: Vec<String> = std::env::args().collect();

    let mut records = Vec::with_capacity(modes.len());
    for mode in modes {
        info!(%mode, compiler = runner.factory().name(), "benchmarking");
        let mut record = measure_with_env(&runner, mode, opts, env.clone())?;
        record.cli_args = cli_args.clone();

        if let Some(stats) = &record.compile_stats {
            println!(
                "{}: {} avg={:.3}ms min={:.3}ms max={:.3}ms n={} errors={} warnings={}",
                mode,
                record.input_name,
                stats.mean_ms,
                stats.min_ms,
                stats.max_ms,
                stats.iterations,
                record.error_count,
                record.warning_count
            );
        }
        records.push(record);
    }

    if let Some(path) = jsonl_out {
        let writer = JsonlWriter::new(path);
        for record in &records {
            writer.append(record)?;
        }
    }
    if let Some(path) = json_out {
        write_json(&path, &records)?;
    }
    Ok(records)
}

/// Populate the fixture cache without measuring anything.
pub fn fetch(overrides: Overrides) -> BenchResult<()> {
    let cfg = overrides.resolve()?;
    let cache = cfg.fixture_cache();
    let fixture = cache.get_fixture(&cfg.fixture.name, &cfg.fixture.url, &HttpFetcher)?;
    println!(
        "{} ({} bytes, sha256 {})",
        cache.path_for(&fixture.name).display(),
        fixture.text.len(),
        fixture.sha256()
    );
    Ok(())
}

/// Resolve the externs and list them in the order the modern mode passes them.
/// With `compiler_jar`, the jar's bundled archive is read unless the config
/// names one explicitly.
pub fn externs(overrides: Overrides, compiler_jar: Option<PathBuf>) -> BenchResult<()> {
    let cfg = overrides.resolve()?;
    let archive = cfg.archive_source_with_jar(compiler_jar.as_deref());
    let bundle = resolve_externs(&archive, &cfg.externs.required, cfg.missing_policy())?;
    println!("# {}", archive.describe());
    for entry in bundle.entries() {
        match &entry.text {
            Some(text) => println!("{} {}", entry.name, text.len()),
            None => println!("{} missing", entry.name),
        }
    }
    println!("{} (legacy, not compiled)", bundle.placeholder().name());
    Ok(())
}

/// One line per stored record, optionally restricted to `mode`.
pub fn summary(jsonl: &Path, mode: Option<Mode>) -> BenchResult<Vec<String>> {
    let writer = JsonlWriter::new(jsonl);
    let total = writer.count()?;
    let records = writer.read_filtered(mode)?;
    let mut lines: Vec<String> = records
        .iter()
        .map(|r| {
            let mean = r.compile_stats.as_ref().map(|s| s.mean_ms).unwrap_or(0.0);
            format!(
                "{} {} {} {} mean={:.3}ms errors={} warnings={}",
                r.timestamp, r.mode, r.fixture_name, r.compiler.name, mean, r.error_count, r.warning_count
            )
        })
        .collect();
    lines.push(format!("{} of {} records", records.len(), total));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompilerInfo, EnvironmentInfo, RunConfig, TimingStat};

    fn config_file(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("jsparse-bench.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_overrides_apply_on_top_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            config: Some(config_file(&dir, "[run]\nthreads = 2\n")),
            cache_dir: Some(PathBuf::from("/tmp/cache")),
            externs_archive: None,
            allow_missing_externs: true,
            iterations: Some(3),
            warmup: Some(0),
            threads: None,
        };
        let cfg = overrides.resolve().unwrap();
        assert_eq!(cfg.fixture.cache_dir, PathBuf::from("/tmp/cache"));
        assert!(cfg.externs.allow_missing);
        assert_eq!(cfg.run.iterations, 3);
        assert_eq!(cfg.run.warmup, 0);
        assert_eq!(cfg.run.threads, 2);
    }

    #[test]
    fn test_overrides_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            config: Some(config_file(&dir, "")),
            iterations: Some(0),
            ..Default::default()
        };
        assert!(overrides.resolve().is_err());
    }

    #[test]
    fn test_closure_choice_exposes_jar() {
        let choice = CompilerChoice::Closure {
            jar: PathBuf::from("cc.jar"),
            java: None,
            flags: vec![],
        };
        assert_eq!(choice.jar(), Some(Path::new("cc.jar")));
        assert_eq!(CompilerChoice::Mock.jar(), None);
    }

    #[test]
    fn test_summary_filters_by_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        let writer = JsonlWriter::new(&path);
        for mode in [Mode::Legacy, Mode::ModernToLegacy, Mode::Legacy] {
            let mut record = BenchRecord::new(
                mode,
                "less.js".into(),
                EnvironmentInfo::default(),
                CompilerInfo {
                    name: "mock".into(),
                    version: None,
                },
                RunConfig::default(),
            );
            record.compile_stats = Some(TimingStat::from_samples(&[2.0, 4.0]));
            writer.append(&record).unwrap();
        }

        let lines = summary(&path, Some(Mode::Legacy)).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(" legacy less.js mock mean=3.000ms"));
        assert_eq!(lines[2], "2 of 3 records");

        let all = summary(&path, None).unwrap();
        assert_eq!(all.last().unwrap(), "3 of 3 records");
    }
}
