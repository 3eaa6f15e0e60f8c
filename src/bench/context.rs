//! One-shot initialisation of the read-only inputs every measured invocation
//! shares: the fixture text and the resolved externs.

use tracing::info;

use crate::BenchResult;
use crate::compiler::SourceUnit;
use crate::externs::{ArchiveSource, ExternsBundle, resolve_externs};
use crate::fixture::{Fetch, Fixture};
use crate::pipeline::Mode;

use super::config::HarnessConfig;

/// Immutable after construction; shared by reference across worker threads.
#[derive(Debug, Clone)]
pub struct BenchContext {
    fixture: Fixture,
    externs: ExternsBundle,
}

impl BenchContext {
    pub fn new(fixture: Fixture, externs: ExternsBundle) -> Self {
        BenchContext { fixture, externs }
    }

    /// Resolve the fixture (network only on a cold cache) and the externs
    /// from `archive`.
    ///
    /// Call once from the process entry point, before any iteration runs.
    pub fn initialize(
        config: &HarnessConfig,
        fetcher: &dyn Fetch,
        archive: &ArchiveSource,
    ) -> BenchResult<Self> {
        let fixture = config.fixture_cache().get_fixture(
            &config.fixture.name,
            &config.fixture.url,
            fetcher,
        )?;
        let externs = resolve_externs(archive, &config.externs.required, config.missing_policy())?;
        info!(
            fixture = %fixture.name,
            bytes = fixture.text.len(),
            externs = externs.entries().len(),
            "benchmark context ready"
        );
        Ok(Self::new(fixture, externs))
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn externs(&self) -> &ExternsBundle {
        &self.externs
    }

    /// The fixture wrapped as the sole source unit for `mode`.
    pub fn source_for(&self, mode: Mode) -> SourceUnit {
        SourceUnit::from_code(mode.input_name(), self.fixture.text.clone())
    }
}
