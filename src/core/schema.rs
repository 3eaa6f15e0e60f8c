//! BenchRecord schema v1 - one record per measured mode.

use serde::{Deserialize, Serialize};

use crate::pipeline::{LanguageMode, Mode};

use super::env::EnvironmentInfo;

/// Schema version for forward compatibility
pub const SCHEMA_VERSION: u32 = 1;

/// Timing statistics for a benchmark phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingStat {
    pub iterations: u32,
    pub mean_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev_ms: Option<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95_ms: Option<f64>,
}

impl TimingStat {
    /// Create TimingStat from a slice of sample times in milliseconds
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return TimingStat {
                iterations: 0,
                mean_ms: 0.0,
                median_ms: None,
                stddev_ms: None,
                min_ms: 0.0,
                max_ms: 0.0,
                p95_ms: None,
            };
        }

        let sum: f64 = samples.iter().sum();
        let mean_ms = sum / n as f64;

        let min_ms = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let variance: f64 = samples.iter().map(|x| (x - mean_ms).powi(2)).sum::<f64>() / n as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median_ms = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        // p95: index = ceil(0.95 * n) - 1, clamped
        let p95_idx = ((0.95 * n as f64).ceil() as usize)
            .saturating_sub(1)
            .min(n - 1);

        TimingStat {
            iterations: n as u32,
            mean_ms,
            median_ms: Some(median_ms),
            stddev_ms: Some(variance.sqrt()),
            min_ms,
            max_ms,
            p95_ms: Some(sorted[p95_idx]),
        }
    }
}

/// Compiler collaborator information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Run configuration for benchmarks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub warmup_iterations: u32,
    pub measured_iterations: u32,
    #[serde(default = "default_threads")]
    pub threads: u32,
}

fn default_threads() -> u32 {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            warmup_iterations: 5,
            measured_iterations: 5,
            threads: 1,
        }
    }
}

/// Canonical benchmark record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchRecord {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    /// Unique identifier for this record
    pub record_id: String,

    /// ISO 8601 timestamp
    pub timestamp: String,

    pub mode: Mode,

    /// Name of the source unit wrapping the fixture
    pub input_name: String,

    pub language_in: LanguageMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_out: Option<LanguageMode>,

    // --- Fixture ---
    pub fixture_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture_sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture_bytes: Option<u64>,

    /// Extern unit names passed to every compile, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub externs: Vec<String>,

    /// Environment information (CPU, OS, versions, etc.)
    pub env: EnvironmentInfo,

    pub compiler: CompilerInfo,

    /// Run configuration
    pub config: RunConfig,

    /// Per-invocation compile timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_stats: Option<TimingStat>,

    // --- Diagnostics from the last measured invocation ---
    #[serde(default)]
    pub error_count: usize,

    #[serde(default)]
    pub warning_count: usize,

    // --- Memory metrics ---
    /// Largest RSS seen over the measured invocations, in MB: the compiler
    /// process when it runs out of process, otherwise the harness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_rss_mb: Option<f64>,

    // --- CLI context ---
    /// Command line arguments used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_args: Vec<String>,
}

impl BenchRecord {
    /// Create a new BenchRecord with required fields
    pub fn new(
        mode: Mode,
        fixture_name: String,
        env: EnvironmentInfo,
        compiler: CompilerInfo,
        config: RunConfig,
    ) -> Self {
        let timestamp = crate::now_string();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let record_id = format!(
            "{:x}-{}",
            nanos,
            timestamp
                .get(..19)
                .unwrap_or(&timestamp)
                .replace([':', '-', 'T'], "")
        );
        let pipeline = crate::pipeline::build_config(mode);

        BenchRecord {
            schema_version: SCHEMA_VERSION,
            record_id,
            timestamp,
            mode,
            input_name: mode.input_name().to_string(),
            language_in: pipeline.language_in,
            language_out: pipeline.language_out,
            fixture_name,
            fixture_sha256: None,
            fixture_bytes: None,
            externs: Vec::new(),
            env,
            compiler,
            config,
            compile_stats: None,
            error_count: 0,
            warning_count: 0,
            peak_rss_mb: None,
            cli_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_stat_from_samples() {
        let samples = vec![100.0, 110.0, 105.0, 115.0, 120.0];
        let stat = TimingStat::from_samples(&samples);

        assert_eq!(stat.iterations, 5);
        assert!((stat.mean_ms - 110.0).abs() < 0.001);
        assert_eq!(stat.min_ms, 100.0);
        assert_eq!(stat.max_ms, 120.0);
        assert_eq!(stat.median_ms, Some(110.0));
        // sqrt((100 + 0 + 25 + 25 + 100) / 5) = sqrt(50)
        assert!((stat.stddev_ms.unwrap() - 7.071).abs() < 0.01);
        assert_eq!(stat.p95_ms, Some(120.0));
    }

    #[test]
    fn test_timing_stat_even_median() {
        let stat = TimingStat::from_samples(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stat.median_ms, Some(2.5));
    }

    #[test]
    fn test_timing_stat_empty_samples() {
        let stat = TimingStat::from_samples(&[]);

        assert_eq!(stat.iterations, 0);
        assert_eq!(stat.mean_ms, 0.0);
        assert!(stat.median_ms.is_none());
    }

    #[test]
    fn test_record_carries_mode_languages() {
        let record = BenchRecord::new(
            Mode::ModernToLegacy,
            "fixture.js".into(),
            EnvironmentInfo::default(),
            CompilerInfo {
                name: "mock".into(),
                version: None,
            },
            RunConfig::default(),
        );
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        assert_eq!(record.input_name, "es6script.js");
        assert_eq!(record.language_in, LanguageMode::Ecmascript6);
        assert_eq!(record.language_out, Some(LanguageMode::Ecmascript5));
        assert!(!record.record_id.is_empty());
    }
}
