//! Warmup + measured iterations over `Runner::invoke`, aggregated into a
//! `BenchRecord`.

use std::time::Instant;

use tracing::{debug, info};

use crate::core::env::current_rss_bytes;
use crate::core::{BenchRecord, CompilerInfo, EnvironmentInfo, RunConfig, TimingStat};
use crate::pipeline::Mode;
use crate::{BenchError, BenchResult};

use super::runner::Runner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureOptions {
    pub warmup: usize,
    pub iterations: usize,
    /// Worker threads sharing the measured iterations.
    pub threads: usize,
}

impl Default for MeasureOptions {
    fn default() -> Self {
        MeasureOptions {
            warmup: 5,
            iterations: 5,
            threads: 1,
        }
    }
}

/// Samples, last-seen diagnostic counts and peak RSS from one worker.
struct WorkerResult {
    samples_ms: Vec<f64>,
    errors: usize,
    warnings: usize,
    peak_rss_bytes: Option<u64>,
}

fn timed_runs(runner: &Runner, mode: Mode, count: usize) -> BenchResult<WorkerResult> {
    let mut result = WorkerResult {
        samples_ms: Vec::with_capacity(count),
        errors: 0,
        warnings: 0,
        peak_rss_bytes: None,
    };
    for _ in 0..count {
        let start = Instant::now();
        let invocation = runner.invoke(mode)?;
        result.samples_ms.push(start.elapsed().as_secs_f64() * 1000.0);
        result.errors = invocation.errors().len();
        result.warnings = invocation.warnings().len();
        // In-process compilers report nothing; fall back to the harness itself.
        let rss = invocation.peak_rss_bytes().or_else(current_rss_bytes);
        result.peak_rss_bytes = result.peak_rss_bytes.max(rss);
    }
    Ok(result)
}

/// Split `iterations` over `threads` as evenly as possible.
fn shares(iterations: usize, threads: usize) -> Vec<usize> {
    let threads = threads.clamp(1, iterations.max(1));
    (0..threads)
        .map(|i| iterations / threads + usize::from(i < iterations % threads))
        .collect()
}

/// Measure `mode` with `env` recorded alongside the timings.
pub fn measure_with_env(
    runner: &Runner,
    mode: Mode,
    opts: MeasureOptions,
    env: EnvironmentInfo,
) -> BenchResult<BenchRecord> {
    if opts.iterations == 0 {
        return Err(BenchError::Config("iterations must be at least 1".into()));
    }

    debug!(%mode, warmup = opts.warmup, "warming up");
    for _ in 0..opts.warmup {
        runner.run(mode)?;
    }

    let shares = shares(opts.iterations, opts.threads);
    let results: Vec<WorkerResult> = if shares.len() == 1 {
        vec![timed_runs(runner, mode, opts.iterations)?]
    } else {
        std::thread::scope(|scope| {
            let handles: Vec<_> = shares
                .iter()
                .map(|&n| scope.spawn(move || timed_runs(runner, mode, n)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .map_err(|_| BenchError::Message("measurement worker panicked".into()))?
                })
                .collect::<BenchResult<Vec<_>>>()
        })?
    };

    let samples: Vec<f64> = results.iter().flat_map(|r| r.samples_ms.iter().copied()).collect();
    let last = results.last();

    let compiler = CompilerInfo {
        name: runner.factory().name().to_string(),
        version: runner.factory().version(),
    };
    let config = RunConfig {
        warmup_iterations: opts.warmup as u32,
        measured_iterations: opts.iterations as u32,
        threads: shares.len() as u32,
    };
    let context = runner.context();
    let mut record = BenchRecord::new(mode, context.fixture().name.clone(), env, compiler, config);
    record.fixture_sha256 = Some(context.fixture().sha256());
    record.fixture_bytes = Some(context.fixture().text.len() as u64);
    record.externs = context
        .externs()
        .units_for(mode)
        .iter()
        .map(|u| u.name().to_string())
        .collect();
    record.compile_stats = Some(TimingStat::from_samples(&samples));
    record.error_count = last.map(|r| r.errors).unwrap_or(0);
    record.warning_count = last.map(|r| r.warnings).unwrap_or(0);
    record.peak_rss_mb = results
        .iter()
        .filter_map(|r| r.peak_rss_bytes)
        .max()
        .map(|b| b as f64 / (1024.0 * 1024.0));

    if let Some(stats) = &record.compile_stats {
        info!(
            %mode,
            mean_ms = stats.mean_ms,
            min_ms = stats.min_ms,
            max_ms = stats.max_ms,
            "measured"
        );
    }
    Ok(record)
}

/// Measure `mode`, detecting the environment first.
pub fn measure(runner: &Runner, mode: Mode, opts: MeasureOptions) -> BenchResult<BenchRecord> {
    measure_with_env(runner, mode, opts, EnvironmentInfo::detect())
}
