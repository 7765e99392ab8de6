use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use codescan_core::analysis::analyze;
use codescan_core::services::default_scanner_registry;
use serde::Serialize;
use tracing::{info, warn};

use crate::canonicalize_or_current;
use crate::commands::{record_scan, ScanSetup};

#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub path: String,
    pub file_size: u64,
    /// Bytes actually scanned; smaller than `file_size` when capped.
    pub scanned: u64,
    pub verdict: Option<String>,
    pub architecture: Option<String>,
    pub error: Option<String>,
}

/// Options for `codescan batch`.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub root: String,
    pub dir: PathBuf,
    pub backend: Option<String>,
    /// Override the configured window cap.
    pub max_window: Option<u64>,
    pub json: bool,
}

/// Scan every file below `dir`. Per-file failures are reported and skipped.
pub fn batch_command(options: BatchOptions) -> Result<()> {
    let setup = ScanSetup::load(&options.root, options.backend.as_deref())?;
    let max_window = options.max_window.unwrap_or(setup.analysis.max_window);
    if max_window == 0 {
        return Err(anyhow!("--max-window must be greater than zero"));
    }

    let dir = canonicalize_or_current(&options.dir.to_string_lossy())?;
    if !dir.is_dir() {
        return Err(anyhow!("Not a directory: {}", dir.display()));
    }
    let files = collect_files(&dir)?;

    let registry = default_scanner_registry();
    let mut handle = setup.open_scanner(&registry)?;
    let mut entries = Vec::with_capacity(files.len());

    for (path, file_size) in files {
        // Large files are only scanned up to the cap to bound mask memory.
        let end = if file_size > max_window { max_window } else { 0 };
        let mut entry = BatchEntry {
            path: path.display().to_string(),
            file_size,
            scanned: file_size.min(max_window),
            verdict: None,
            architecture: None,
            error: None,
        };
        match analyze(&mut handle, &path, 0, end, setup.analysis.aggressive) {
            Ok(report) => {
                info!(path = %path.display(), verdict = report.verdict.code(), "scanned");
                record_scan(&setup, &report)?;
                entry.verdict = Some(report.verdict.code().to_string());
                entry.architecture = report.code_label.clone();
            }
            Err(err) => {
                warn!(path = %path.display(), "skipping file: {err}");
                entry.error = Some(err.to_string());
            }
        }
        entries.push(entry);
    }
    handle.shutdown();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Batch scan of {} ({} files)", dir.display(), entries.len());
    for entry in &entries {
        match (&entry.verdict, &entry.error) {
            (Some(verdict), _) => {
                let arch = entry.architecture.as_deref().unwrap_or("-");
                println!("  {} {} [{}]", verdict, entry.path, arch);
            }
            (None, Some(error)) => println!("  (!) {} - {}", entry.path, error),
            (None, None) => println!("  (?) {}", entry.path),
        }
    }
    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    println!("Scanned: {}, failed: {}", entries.len() - failed, failed);
    Ok(())
}

/// Regular files below `dir`, sorted by path, with their sizes.
fn collect_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut out = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current)
            .with_context(|| format!("Failed to read {}", current.display()))?
        {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                out.push((entry.path(), entry.metadata()?.len()));
            }
        }
    }
    out.sort();
    Ok(out)
}
