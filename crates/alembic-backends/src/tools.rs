//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of external CLI
//! tools (ffmpeg, the poppler utilities, soffice, espeak-ng, 7z, unrar) and
//! provides lookup methods for the backends. Every invocation enforces a
//! bounded execution time: a hung external tool is killed rather than hanging
//! the job that invoked it.

use crate::backend::BackendError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Default tool timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Known tool names that the registry manages.
pub const KNOWN_TOOLS: &[&str] = &[
    "ffmpeg",
    "pdftotext",
    "pdftoppm",
    "soffice",
    "espeak-ng",
    "espeak",
    "7z",
    "7za",
    "unrar",
];

/// Optional per-tool path overrides from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub ffmpeg_path: Option<PathBuf>,
    pub pdftotext_path: Option<PathBuf>,
    pub pdftoppm_path: Option<PathBuf>,
    pub soffice_path: Option<PathBuf>,
    /// Applies to both `espeak-ng` and `espeak`.
    pub espeak_path: Option<PathBuf>,
    /// Applies to both `7z` and `7za`.
    pub sevenzip_path: Option<PathBuf>,
    pub unrar_path: Option<PathBuf>,
    /// Maximum seconds an external tool may run before it is killed.
    pub tool_timeout_secs: Option<u64>,
}

/// Configuration for a single external tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time before the tool is killed.
    pub timeout: Duration,
}

impl ToolConfig {
    /// Run the tool to completion, enforcing the timeout.
    pub fn run(&self, args: &[String]) -> Result<(), BackendError> {
        self.run_in(None, args)
    }

    /// Run the tool with an explicit working directory.
    ///
    /// stderr goes to a scratch file so a chatty tool (ffmpeg) cannot fill a
    /// pipe and stall; the tail is included in the error on failure.
    pub fn run_in(&self, cwd: Option<&Path>, args: &[String]) -> Result<(), BackendError> {
        let stderr_file = tempfile::NamedTempFile::new()
            .map_err(|e| BackendError::new(format!("failed to create scratch file: {e}")))?;
        let stderr_handle = stderr_file
            .reopen()
            .map_err(|e| BackendError::new(format!("failed to open scratch file: {e}")))?;

        let mut cmd = Command::new(&self.path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_handle));
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        tracing::debug!(tool = %self.name, ?args, "Running external tool");

        let mut child = cmd
            .spawn()
            .map_err(|e| BackendError::new(format!("failed to spawn {}: {e}", self.name)))?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(BackendError::new(format!(
                            "{} timed out after {}s",
                            self.name,
                            self.timeout.as_secs()
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(BackendError::new(format!(
                        "failed to wait for {}: {e}",
                        self.name
                    )))
                }
            }
        };

        if !status.success() {
            let detail = read_tail(stderr_file.path());
            return Err(BackendError::new(format!(
                "{} exited with {status}: {detail}",
                self.name
            )));
        }
        Ok(())
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of version output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if [`ToolPaths`] supplies a custom path **and**
    /// that path exists, it is used directly. Otherwise [`which::which`]
    /// locates the tool in `PATH`. Tools that are not found are silently
    /// omitted; the backends that need them report degraded capabilities.
    pub fn discover(paths: &ToolPaths) -> Self {
        let timeout = paths
            .tool_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => paths.ffmpeg_path.as_deref(),
                "pdftotext" => paths.pdftotext_path.as_deref(),
                "pdftoppm" => paths.pdftoppm_path.as_deref(),
                "soffice" => paths.soffice_path.as_deref(),
                "espeak-ng" | "espeak" => paths.espeak_path.as_deref(),
                "7z" | "7za" => paths.sevenzip_path.as_deref(),
                "unrar" => paths.unrar_path.as_deref(),
                _ => None,
            };

            let resolved = if let Some(p) = custom_path {
                if p.exists() {
                    Some(p.to_path_buf())
                } else {
                    // Custom path does not exist; fall back to PATH.
                    which::which(name).ok()
                }
            } else {
                which::which(name).ok()
            };

            if let Some(path) = resolved {
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        timeout,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Look up a discovered tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolConfig> {
        self.tools.get(name)
    }

    /// First discovered tool among `names`, in preference order.
    pub fn first_of(&self, names: &[&str]) -> Option<&ToolConfig> {
        names.iter().find_map(|n| self.tools.get(*n))
    }

    /// Return the [`ToolConfig`] for the given tool, or a [`BackendError`]
    /// if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> Result<&ToolConfig, BackendError> {
        self.tools.get(name).ok_or_else(|| {
            BackendError::new(format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| {
                if let Some(cfg) = self.tools.get(name) {
                    let version = detect_version(name, &cfg.path);
                    ToolInfo {
                        name: name.to_string(),
                        available: true,
                        version,
                        path: Some(cfg.path.clone()),
                    }
                } else {
                    ToolInfo {
                        name: name.to_string(),
                        available: false,
                        version: None,
                        path: None,
                    }
                }
            })
            .collect()
    }
}

/// Run the tool's version flag and return the first line of its output.
///
/// The poppler utilities print their version to stderr, so both streams are
/// consulted.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" => "-version",
        "pdftotext" | "pdftoppm" => "-v",
        _ => "--version",
    };

    let output = Command::new(path).arg(version_arg).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if let Some(line) = stdout.lines().next() {
        if !line.trim().is_empty() {
            return Some(line.to_string());
        }
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    stderr
        .lines()
        .next()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.to_string())
}

/// Last ~500 characters of a captured stderr file.
fn read_tail(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            let count = trimmed.chars().count();
            if count > 500 {
                trimmed.chars().skip(count - 500).collect()
            } else {
                trimmed.to_string()
            }
        }
        Err(_) => String::from("(no stderr captured)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_paths() {
        let registry = ToolRegistry::discover(&ToolPaths::default());
        // We cannot guarantee any tool is installed in CI,
        // but the call itself must not panic.
        let _ = registry.check_all();
    }

    #[test]
    fn require_missing_tool_returns_error() {
        let registry = ToolRegistry::discover(&ToolPaths::default());
        let result = registry.require("nonexistent_tool_xyz");
        assert!(result.is_err());
    }

    #[test]
    fn check_all_returns_known_tools() {
        let registry = ToolRegistry::discover(&ToolPaths::default());
        let infos = registry.check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"ffmpeg"));
        assert!(names.contains(&"pdftoppm"));
        assert!(names.contains(&"espeak-ng"));
        assert!(names.contains(&"unrar"));
    }

    #[test]
    fn custom_timeout_is_applied() {
        let paths = ToolPaths {
            tool_timeout_secs: Some(10),
            ..Default::default()
        };
        let registry = ToolRegistry::discover(&paths);
        for (_, cfg) in registry.tools.iter() {
            assert_eq!(cfg.timeout, Duration::from_secs(10));
        }
    }
}
