//! Environment detection utilities for benchmark records.

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

/// Environment information for benchmark reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,

    pub os: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_version: Option<String>,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        EnvironmentInfo {
            cpu_model: None,
            cpu_cores: None,
            total_ram_bytes: None,
            os: std::env::consts::OS.to_string(),
            hostname: None,
            git_sha: None,
            git_dirty: None,
            java_version: None,
        }
    }
}

impl EnvironmentInfo {
    /// Detect environment information from the current system
    pub fn detect() -> Self {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        EnvironmentInfo {
            cpu_model: sys.cpus().first().map(|c| c.brand().to_string()),
            cpu_cores: sys.physical_core_count().map(|c| c as u32),
            total_ram_bytes: Some(sys.total_memory()),
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            hostname: System::host_name(),
            git_sha: detect_git_sha(),
            git_dirty: detect_git_dirty(),
            java_version: None,
        }
    }

    /// Detect, including the version of the given java binary.
    pub fn detect_with_java(java: &Path) -> Self {
        let mut env = Self::detect();
        env.java_version = detect_java_version(java);
        env
    }
}

/// Detect git SHA from `git rev-parse HEAD`
fn detect_git_sha() -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Detect if git working directory is dirty
fn detect_git_dirty() -> Option<bool> {
    Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| !o.stdout.is_empty())
}

/// `java -version` prints to stderr.
fn detect_java_version(java: &Path) -> Option<String> {
    Command::new(java)
        .arg("-version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stderr).ok())
        .and_then(|s| parse_java_version(&s))
}

/// First quoted token of `java -version` output, e.g. `17.0.9`.
pub fn parse_java_version(output: &str) -> Option<String> {
    let first = output.lines().next()?;
    let start = first.find('"')? + 1;
    let len = first[start..].find('"')?;
    Some(first[start..start + len].to_string()).filter(|v| !v.is_empty())
}

/// Resident set size of this process in bytes.
#[cfg(feature = "mem")]
pub fn current_rss_bytes() -> Option<u64> {
    use sysinfo::{ProcessRefreshKind, RefreshKind, System};

    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new().with_memory()),
    );
    sys.refresh_process(pid);
    sys.process(pid).map(|p| p.memory())
}

#[cfg(not(feature = "mem"))]
pub fn current_rss_bytes() -> Option<u64> {
    None
}

/// Tracks the largest resident set size seen for one process across
/// repeated `sample` calls.
#[cfg(feature = "mem")]
pub struct RssSampler {
    sys: sysinfo::System,
    pid: sysinfo::Pid,
    peak: Option<u64>,
}

#[cfg(feature = "mem")]
impl RssSampler {
    pub fn new(pid: u32) -> Self {
        use sysinfo::{ProcessRefreshKind, RefreshKind, System};

        RssSampler {
            sys: System::new_with_specifics(
                RefreshKind::new().with_processes(ProcessRefreshKind::new().with_memory()),
            ),
            pid: sysinfo::Pid::from_u32(pid),
            peak: None,
        }
    }

    pub fn sample(&mut self) {
        self.sys.refresh_process(self.pid);
        if let Some(p) = self.sys.process(self.pid) {
            self.peak = Some(self.peak.unwrap_or(0).max(p.memory()));
        }
    }

    pub fn peak_bytes(&self) -> Option<u64> {
        self.peak
    }
}

#[cfg(not(feature = "mem"))]
pub struct RssSampler;

#[cfg(not(feature = "mem"))]
impl RssSampler {
    pub fn new(_pid: u32) -> Self {
        RssSampler
    }

    pub fn sample(&mut self) {}

    pub fn peak_bytes(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_detect_has_os() {
        let env = EnvironmentInfo::detect();
        assert!(!env.os.is_empty());
    }

    #[test]
    fn test_environment_default() {
        let env = EnvironmentInfo::default();
        assert!(!env.os.is_empty());
        assert!(env.cpu_model.is_none());
        assert!(env.java_version.is_none());
    }

    #[cfg(feature = "mem")]
    #[test]
    fn test_rss_sampler_keeps_maximum() {
        let mut sampler = RssSampler::new(std::process::id());
        assert!(sampler.peak_bytes().is_none());
        sampler.sample();
        let first = sampler.peak_bytes().unwrap();
        assert!(first > 0);
        sampler.sample();
        assert!(sampler.peak_bytes().unwrap() >= first);
    }

    #[test]
    fn test_rss_sampler_unknown_pid_reports_nothing() {
        let mut sampler = RssSampler::new(u32::MAX - 1);
        sampler.sample();
        assert!(sampler.peak_bytes().is_none());
    }

    #[test]
    fn test_parse_java_version() {
        let out = "openjdk version \"17.0.9\" 2023-10-17\nOpenJDK Runtime Environment (build 17.0.9+9)\n";
        assert_eq!(parse_java_version(out), Some("17.0.9".to_string()));
        assert_eq!(parse_java_version("no quotes here"), None);
        assert_eq!(parse_java_version(""), None);
    }
}
