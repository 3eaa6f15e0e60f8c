pub mod bench;
pub mod compiler;
pub mod core;
pub mod externs;
pub mod fixture;
pub mod pipeline;
pub mod run_cmd;
pub mod storage;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Remote fixture unreachable, non-success status or undecodable body.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to write fixture cache {}: {source}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read fixture cache {}: {source}", path.display())]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Externs archive missing or not a valid zip stream.
    #[error("externs archive: {0}")]
    Resource(String),
    #[error("required externs missing from archive: {}", .0.join(", "))]
    MissingExtern(Vec<String>),
    #[error("compile failed: {0}")]
    Compile(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;

// Shared helpers
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

pub fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}
