//! Fixture cache: resolves a named JavaScript input from local disk, or
//! downloads it once and writes it through to the cache directory.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::{BenchError, BenchResult};

/// Default fixture used by every measured compile.
pub const DEFAULT_FIXTURE_NAME: &str = "less-rhino-1.7.5.js";
pub const DEFAULT_FIXTURE_URL: &str =
    "https://raw.githubusercontent.com/less/less.js/v1.7.5/dist/less-rhino-1.7.5.js";
pub const DEFAULT_CACHE_DIR: &str = ".tmp";

/// The JavaScript source under test. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub name: String,
    pub text: Arc<str>,
}

impl Fixture {
    pub fn new(name: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
        Fixture {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn sha256(&self) -> String {
        crate::sha256_hex(self.text.as_bytes())
    }
}

/// Source of fixture bytes when the cache is cold.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> BenchResult<String>;
}

/// Blocking HTTP(S) GET. Non-2xx statuses are errors; no retries.
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher;

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> BenchResult<String> {
        let fetch_err = |reason: String| BenchError::Fetch {
            url: url.to_string(),
            reason,
        };
        let resp = ureq::get(url).call().map_err(|e| fetch_err(e.to_string()))?;
        let mut reader = resp.into_body().into_reader();
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| fetch_err(format!("read body: {e}")))?;
        String::from_utf8(buf).map_err(|e| fetch_err(format!("body is not UTF-8: {e}")))
    }
}

/// Local cache of downloaded fixtures, one file per fixture name.
#[derive(Debug, Clone)]
pub struct FixtureCache {
    cache_dir: PathBuf,
}

impl Default for FixtureCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl FixtureCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        FixtureCache {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Deterministic cache location for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }

    /// Return the fixture text, reading the cache file if present and
    /// otherwise fetching `url` and persisting the body before returning it.
    pub fn get_fixture(&self, name: &str, url: &str, fetcher: &dyn Fetch) -> BenchResult<Fixture> {
        let path = self.path_for(name);
        if path.exists() {
            debug!(path = %path.display(), "fixture cache hit");
            let text = std::fs::read_to_string(&path).map_err(|source| BenchError::CacheRead {
                path: path.clone(),
                source,
            })?;
            return Ok(Fixture::new(name, text));
        }

        info!(%url, "fixture cache miss, downloading");
        let text = fetcher.fetch(url)?;
        if text.is_empty() {
            return Err(BenchError::Fetch {
                url: url.to_string(),
                reason: "empty response body".into(),
            });
        }
        write_through(&path, &text)?;
        info!(path = %path.display(), bytes = text.len(), "fixture cached");
        Ok(Fixture::new(name, text))
    }
}

/// Written through a sibling temp file; the cache path only ever holds a
/// complete body.
fn write_through(path: &Path, text: &str) -> BenchResult<()> {
    let cache_err = |source| BenchError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(cache_err)?;
    }
    let tmp = path.with_extension("download.tmp");
    std::fs::write(&tmp, text).map_err(cache_err)?;
    std::fs::rename(&tmp, path).map_err(cache_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        body: String,
        calls: AtomicUsize,
    }

    impl Fetch for CountingFetcher {
        fn fetch(&self, _url: &str) -> BenchResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    #[test]
    fn test_path_for_is_under_cache_dir() {
        let cache = FixtureCache::new("/tmp/fixtures");
        assert_eq!(cache.path_for("a.js"), PathBuf::from("/tmp/fixtures/a.js"));
    }

    #[test]
    fn test_second_call_served_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FixtureCache::new(dir.path().join("nested/cache"));
        let fetcher = CountingFetcher {
            body: "var x = 1;".into(),
            calls: AtomicUsize::new(0),
        };

        let first = cache.get_fixture("x.js", "http://unused", &fetcher).unwrap();
        let second = cache.get_fixture("x.js", "http://unused", &fetcher).unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert!(!cache.path_for("x.download.tmp").exists());
    }

    #[test]
    fn test_empty_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FixtureCache::new(dir.path());
        let fetcher = CountingFetcher {
            body: String::new(),
            calls: AtomicUsize::new(0),
        };
        let err = cache.get_fixture("x.js", "http://unused", &fetcher).unwrap_err();
        assert!(matches!(err, BenchError::Fetch { .. }));
        assert!(!cache.path_for("x.js").exists());
    }

    #[test]
    fn test_fixture_sha256_is_stable() {
        let a = Fixture::new("a.js", "var x = 1;");
        let b = Fixture::new("b.js", "var x = 1;");
        assert_eq!(a.sha256(), b.sha256());
        assert_eq!(a.sha256().len(), 64);
    }
}
