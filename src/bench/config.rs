use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::externs::{ArchiveSource, MissingExternPolicy, default_required};
use crate::fixture::{DEFAULT_CACHE_DIR, DEFAULT_FIXTURE_NAME, DEFAULT_FIXTURE_URL, FixtureCache};
use crate::{BenchError, BenchResult};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "jsparse-bench.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixtureSection {
    pub name: String,
    pub url: String,
    pub cache_dir: PathBuf,
}

impl Default for FixtureSection {
    fn default() -> Self {
        FixtureSection {
            name: DEFAULT_FIXTURE_NAME.to_string(),
            url: DEFAULT_FIXTURE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExternsSection {
    /// Zip archive on disk; the embedded archive when unset.
    pub archive: Option<PathBuf>,
    pub required: Vec<String>,
    pub allow_missing: bool,
}

impl Default for ExternsSection {
    fn default() -> Self {
        ExternsSection {
            archive: None,
            required: default_required(),
            allow_missing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub warmup: usize,
    pub iterations: usize,
    pub threads: usize,
}

impl Default for RunSection {
    fn default() -> Self {
        RunSection {
            warmup: 5,
            iterations: 5,
            threads: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub fixture: FixtureSection,
    pub externs: ExternsSection,
    pub run: RunSection,
}

impl HarnessConfig {
    pub fn from_toml(s: &str) -> BenchResult<Self> {
        let cfg: HarnessConfig = toml::from_str(s).map_err(|e| BenchError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.fixture.name.is_empty() {
            return Err(BenchError::Config("fixture.name must not be empty".into()));
        }
        if Path::new(&self.fixture.name).file_name().and_then(|n| n.to_str())
            != Some(self.fixture.name.as_str())
        {
            return Err(BenchError::Config(format!(
                "fixture.name must be a plain file name, got '{}'",
                self.fixture.name
            )));
        }
        if self.externs.required.is_empty() {
            return Err(BenchError::Config("externs.required must not be empty".into()));
        }
        if self.run.iterations == 0 {
            return Err(BenchError::Config("run.iterations must be at least 1".into()));
        }
        if self.run.threads == 0 {
            return Err(BenchError::Config("run.threads must be at least 1".into()));
        }
        Ok(())
    }

    pub fn fixture_cache(&self) -> FixtureCache {
        FixtureCache::new(&self.fixture.cache_dir)
    }

    pub fn archive_source(&self) -> ArchiveSource {
        self.archive_source_with_jar(None)
    }

    /// An explicit `externs.archive` wins, then the archive inside
    /// `compiler_jar`, then the embedded one.
    pub fn archive_source_with_jar(&self, compiler_jar: Option<&Path>) -> ArchiveSource {
        match (&self.externs.archive, compiler_jar) {
            (Some(path), _) => ArchiveSource::File(path.clone()),
            (None, Some(jar)) => ArchiveSource::Jar(jar.to_path_buf()),
            (None, None) => ArchiveSource::Embedded,
        }
    }

    pub fn missing_policy(&self) -> MissingExternPolicy {
        if self.externs.allow_missing {
            MissingExternPolicy::Allow
        } else {
            MissingExternPolicy::Fail
        }
    }
}

/// Load `path`, or `DEFAULT_CONFIG` if it exists, or the built-in defaults.
pub fn load_harness_config(path: Option<&Path>) -> BenchResult<HarnessConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(HarnessConfig::default());
            }
            default
        }
    };
    let s = std::fs::read_to_string(&path)
        .map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))?;
    HarnessConfig::from_toml(&s)
}
