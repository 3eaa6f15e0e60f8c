//! Externs resolution: pull a fixed allow-list of declaration files out of a
//! zip archive and order them the way the caller listed them.
//!
//! Resolution is two separate steps:
//! - [`scan`] walks every archive entry and keeps the text of allow-listed
//!   base names (later entries overwrite earlier ones with the same base name).
//! - [`project`] reorders the scanned texts by the allow-list.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::compiler::SourceUnit;
use crate::pipeline::Mode;
use crate::{BenchError, BenchResult};

/// Abridged declarations shipped inside the binary. Enough for the mock
/// compiler and dry runs; runs against the real compiler read the archive
/// bundled in its jar instead (see [`ArchiveSource::Jar`]).
pub static EMBEDDED_EXTERNS: &[u8] = include_bytes!("../resources/externs.zip");

/// Declarations required by the modern-to-legacy mode, in compile order.
pub const DEFAULT_REQUIRED_EXTERNS: [&str; 3] = ["es3.js", "es5.js", "es6.js"];

/// Name of the empty unit standing for "no declarations".
pub const PLACEHOLDER_EXTERN: &str = "none.js";

/// Entry name of the externs archive inside closure-compiler.jar.
pub const JAR_EXTERNS_ENTRY: &str = "externs.zip";

/// Where the externs archive comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArchiveSource {
    #[default]
    Embedded,
    File(PathBuf),
    /// `externs.zip` nested inside a compiler jar.
    Jar(PathBuf),
}

impl ArchiveSource {
    pub fn load(&self) -> BenchResult<Cow<'static, [u8]>> {
        match self {
            ArchiveSource::Embedded => Ok(Cow::Borrowed(EMBEDDED_EXTERNS)),
            ArchiveSource::File(path) => std::fs::read(path).map(Cow::Owned).map_err(|e| {
                BenchError::Resource(format!("failed to open {}: {e}", path.display()))
            }),
            ArchiveSource::Jar(path) => extract_from_jar(path).map(Cow::Owned),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ArchiveSource::Embedded => "embedded externs.zip".to_string(),
            ArchiveSource::File(path) => path.display().to_string(),
            ArchiveSource::Jar(path) => format!("{}!/{JAR_EXTERNS_ENTRY}", path.display()),
        }
    }
}

fn extract_from_jar(jar: &Path) -> BenchResult<Vec<u8>> {
    let file = std::fs::File::open(jar)
        .map_err(|e| BenchError::Resource(format!("failed to open {}: {e}", jar.display())))?;
    let mut zip = zip::ZipArchive::new(std::io::BufReader::new(file))
        .map_err(|e| BenchError::Resource(format!("{} is not a jar: {e}", jar.display())))?;
    let mut entry = zip.by_name(JAR_EXTERNS_ENTRY).map_err(|e| {
        BenchError::Resource(format!("{JAR_EXTERNS_ENTRY} not found in {}: {e}", jar.display()))
    })?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| BenchError::Resource(format!("failed to read {JAR_EXTERNS_ENTRY}: {e}")))?;
    Ok(bytes)
}

/// What to do when a required name has no archive entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingExternPolicy {
    /// Resolution fails with `BenchError::MissingExtern`.
    #[default]
    Fail,
    /// Keep the entry with absent text and log a warning.
    Allow,
}

/// One resolved declaration file. `text` is `None` only under
/// `MissingExternPolicy::Allow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternEntry {
    pub name: String,
    pub text: Option<String>,
}

/// Ordered externs plus the empty placeholder, built once and read-only after.
#[derive(Debug, Clone)]
pub struct ExternsBundle {
    entries: Vec<ExternEntry>,
    placeholder: SourceUnit,
    units: Vec<SourceUnit>,
}

impl ExternsBundle {
    pub fn new(entries: Vec<ExternEntry>) -> Self {
        let units = entries
            .iter()
            .map(|e| SourceUnit::from_code(e.name.clone(), e.text.as_deref().unwrap_or_default()))
            .collect();
        ExternsBundle {
            entries,
            placeholder: SourceUnit::from_code(PLACEHOLDER_EXTERN, ""),
            units,
        }
    }

    pub fn entries(&self) -> &[ExternEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Names of required externs that had no archive entry.
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.text.is_none())
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Empty unit describing the legacy configuration. Never compiled.
    pub fn placeholder(&self) -> &SourceUnit {
        &self.placeholder
    }

    /// Externs argument for `mode`: nothing for legacy, the resolved
    /// declarations for modern-to-legacy.
    pub fn units_for(&self, mode: Mode) -> &[SourceUnit] {
        match mode {
            Mode::Legacy => &[],
            Mode::ModernToLegacy => &self.units[..],
        }
    }
}

/// Directory-stripped file name of an archive entry.
fn base_name(entry_name: &str) -> Option<&str> {
    Path::new(entry_name).file_name().and_then(|s| s.to_str())
}

/// Read every entry of `archive`, keeping decoded text for base names in
/// `required`. Entries not in `required` are skipped without decoding.
pub fn scan<R: Read + Seek>(
    archive: R,
    required: &HashSet<&str>,
) -> BenchResult<HashMap<String, String>> {
    let mut zip = zip::ZipArchive::new(archive)
        .map_err(|e| BenchError::Resource(format!("not a valid zip archive: {e}")))?;
    let mut found = HashMap::new();
    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| BenchError::Resource(format!("zip entry {i}: {e}")))?;
        if file.is_dir() {
            continue;
        }
        let Some(name) = base_name(file.name()).filter(|n| required.contains(n)) else {
            continue;
        };
        let name = name.to_string();
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|e| BenchError::Resource(format!("failed to decode {name}: {e}")))?;
        debug!(entry = file.name(), bytes = text.len(), "extern found");
        found.insert(name, text);
    }
    Ok(found)
}

/// Order `found` by `required`. Duplicate names in `required` appear once,
/// at their first position; names absent from `found` get `text: None`.
pub fn project(found: &HashMap<String, String>, required: &[String]) -> Vec<ExternEntry> {
    let mut seen = HashSet::new();
    required
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .map(|name| ExternEntry {
            name: name.clone(),
            text: found.get(name).cloned(),
        })
        .collect()
}

/// Open `source`, scan it and project the result onto `required`.
pub fn resolve_externs(
    source: &ArchiveSource,
    required: &[String],
    policy: MissingExternPolicy,
) -> BenchResult<ExternsBundle> {
    let bytes = source.load()?;
    let wanted: HashSet<&str> = required.iter().map(String::as_str).collect();
    let found = scan(Cursor::new(bytes.as_ref()), &wanted)?;
    let bundle = ExternsBundle::new(project(&found, required));

    let missing = bundle.missing();
    if !missing.is_empty() {
        match policy {
            MissingExternPolicy::Fail => {
                return Err(BenchError::MissingExtern(
                    missing.into_iter().map(str::to_string).collect(),
                ));
            }
            MissingExternPolicy::Allow => {
                warn!(missing = ?missing, "required externs missing, continuing with empty text");
            }
        }
    }

    info!(
        archive = %source.describe(),
        externs = ?bundle.names(),
        "externs resolved"
    );
    Ok(bundle)
}

/// `DEFAULT_REQUIRED_EXTERNS` as owned strings.
pub fn default_required() -> Vec<String> {
    DEFAULT_REQUIRED_EXTERNS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("es5.js"), Some("es5.js"));
        assert_eq!(base_name("externs/browser/es5.js"), Some("es5.js"));
        assert_eq!(base_name("browser/"), Some("browser"));
    }

    #[test]
    fn test_project_keeps_declared_order() {
        let found = HashMap::from([
            ("es6.js".to_string(), "six".to_string()),
            ("es3.js".to_string(), "three".to_string()),
        ]);
        let required = vec!["es6.js".to_string(), "es3.js".to_string(), "es6.js".to_string()];
        let entries = project(&found, &required);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "es6.js");
        assert_eq!(entries[1].text.as_deref(), Some("three"));
    }

    #[test]
    fn test_project_marks_missing() {
        let entries = project(&HashMap::new(), &default_required());
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.text.is_none()));
    }

    #[test]
    fn test_embedded_archive_resolves() {
        let bundle = resolve_externs(
            &ArchiveSource::Embedded,
            &default_required(),
            MissingExternPolicy::Fail,
        )
        .unwrap();
        assert_eq!(bundle.names(), vec!["es3.js", "es5.js", "es6.js"]);
        assert!(bundle.missing().is_empty());
        assert!(bundle.entries().iter().all(|e| e.text.as_deref().is_some_and(|t| !t.is_empty())));
    }

    #[test]
    fn test_units_for_mode() {
        let bundle = ExternsBundle::new(vec![ExternEntry {
            name: "es3.js".into(),
            text: Some("var NaN;".into()),
        }]);
        assert!(bundle.units_for(Mode::Legacy).is_empty());
        assert_eq!(bundle.placeholder().name(), PLACEHOLDER_EXTERN);
        assert!(bundle.placeholder().text.is_empty());
        let modern = bundle.units_for(Mode::ModernToLegacy);
        assert_eq!(modern.len(), 1);
        assert_eq!(&*modern[0].text, "var NaN;");
    }

    #[test]
    fn test_missing_archive_file_is_resource_error() {
        let source = ArchiveSource::File(PathBuf::from("/nonexistent/externs.zip"));
        let err = resolve_externs(&source, &default_required(), MissingExternPolicy::Fail)
            .unwrap_err();
        assert!(matches!(err, BenchError::Resource(_)));
    }
}
