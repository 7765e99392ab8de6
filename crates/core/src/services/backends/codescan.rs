use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::model::RegionSet;
use crate::services::scanner::{
    parse_scan_output, ScanError, ScanRequest, ScannerBackend, ScannerConfig,
};

/// Runs the native scanner helper, which prints its region map as JSON.
pub struct CodescanBackend;

impl ScannerBackend for CodescanBackend {
    fn name(&self) -> &'static str {
        "codescan"
    }

    fn prepare(&self, config: &ScannerConfig) -> Result<String, ScanError> {
        version_string(&resolve_tool_path(config)).map_err(ScanError::Backend)
    }

    fn scan(&self, config: &ScannerConfig, request: &ScanRequest) -> Result<RegionSet, ScanError> {
        // Allow tests to feed synthetic output via env to avoid needing the engine installed.
        if let Some(fake_json) = std::env::var_os("CODESCAN_FAKE_JSON") {
            let body = fs::read_to_string(&fake_json).map_err(|e| {
                ScanError::Backend(format!("failed to read CODESCAN_FAKE_JSON: {e}"))
            })?;
            return parse_scan_output(&body);
        }

        let tool = resolve_tool_path(config);
        let body = run_scanner_json(&tool, resolve_lang_path(config).as_deref(), request)?;
        parse_scan_output(&body)
    }
}

fn resolve_tool_path(config: &ScannerConfig) -> PathBuf {
    config
        .tool_path
        .clone()
        .or_else(|| std::env::var_os("CODESCAN_BIN").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("codescanner"))
}

fn resolve_lang_path(config: &ScannerConfig) -> Option<PathBuf> {
    config.lang_path.clone().or_else(|| std::env::var_os("CODESCAN_LANG_PATH").map(PathBuf::from))
}

fn run_scanner_json(
    tool: &Path,
    lang_path: Option<&Path>,
    request: &ScanRequest,
) -> Result<String, ScanError> {
    let mut cmd = Command::new(tool);
    cmd.arg("--json")
        .args(["--start", &request.start.to_string()])
        .args(["--end", &request.end.to_string()]);
    if request.aggressive {
        cmd.arg("--aggressive");
    }
    if let Some(lang) = lang_path {
        cmd.arg("--lang").arg(lang);
    }
    cmd.arg(&request.path);
    debug!(?cmd, "spawning scanner");

    let output = cmd
        .output()
        .map_err(|e| ScanError::Backend(format!("failed to spawn {}: {e}", tool.display())))?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    // The helper exits non-zero on scan errors but still reports the status
    // in its JSON; only a silent failure is a backend error.
    if !output.status.success() && stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScanError::Backend(format!(
            "scanner exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(stdout)
}

fn version_string(tool: &Path) -> Result<String, String> {
    if let Some(fake) = std::env::var_os("CODESCAN_FAKE_VERSION") {
        return Ok(fake.to_string_lossy().to_string());
    }
    let output = Command::new(tool)
        .arg("--version")
        .output()
        .map_err(|e| format!("failed to spawn {}: {e}", tool.display()))?;
    if !output.status.success() {
        return Err(format!("{} --version exited with {}", tool.display(), output.status));
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        Err(format!("{} --version produced no output", tool.display()))
    } else {
        Ok(stdout)
    }
}
