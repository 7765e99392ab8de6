use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::WorkspaceLayout;
use crate::services::ScannerConfig;

/// Default cap on the scan window used by batch runs (2 MiB).
pub const DEFAULT_MAX_WINDOW: u64 = 2 * 1024 * 1024;

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the results database file (typically relative to the workspace root).
    pub path: String,
}

impl DbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Which scanner backend to use and where its tools live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Registered backend name (`codescan`, `replay`).
    pub backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_dir: Option<String>,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self { backend: "codescan".to_string(), tool_path: None, lang_path: None, replay_dir: None }
    }
}

impl ScannerSettings {
    /// Backend configuration with relative paths resolved against the
    /// workspace root.
    pub fn to_scanner_config(&self, layout: &WorkspaceLayout) -> ScannerConfig {
        ScannerConfig {
            tool_path: self.tool_path.as_ref().map(|p| layout.resolve(p)),
            lang_path: self.lang_path.as_ref().map(|p| layout.resolve(p)),
            replay_dir: self.replay_dir.as_ref().map(|p| layout.resolve(p)),
        }
    }
}

/// Defaults for analysis runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default)]
    pub aggressive: bool,
    /// Largest window a batch run scans per file; bounds mask memory.
    #[serde(default = "default_max_window")]
    pub max_window: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { aggressive: false, max_window: DEFAULT_MAX_WINDOW }
    }
}

fn default_max_window() -> u64 {
    DEFAULT_MAX_WINDOW
}

/// Serializable configuration describing a codescan workspace.
///
/// This lives at `.codescan/config.json` (or `config.yaml`) in the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Human-friendly workspace name.
    pub name: String,
    /// Config format version, not the tool version.
    pub config_version: String,
    pub db: DbConfig,
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

impl WorkspaceConfig {
    /// Create a new configuration using the given name and db path.
    pub fn new(name: impl Into<String>, db_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_version: "0.1.0".to_string(),
            db: DbConfig::new(db_path),
            scanner: ScannerSettings::default(),
            analysis: AnalysisSettings::default(),
        }
    }

    /// Parse a config body, choosing YAML or JSON from the file extension.
    pub fn from_str_for_path(body: &str, path: &Path) -> Result<Self, String> {
        if is_yaml(path) {
            serde_yaml::from_str(body).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(body).map_err(|e| e.to_string())
        }
    }

    /// Serialize for `path`, YAML or pretty JSON by extension.
    pub fn to_string_for_path(&self, path: &Path) -> Result<String, String> {
        if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| e.to_string())
        } else {
            serde_json::to_string_pretty(self).map_err(|e| e.to_string())
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"))
}
