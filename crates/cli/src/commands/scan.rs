use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use codescan_core::analysis::{analyze, expand_tilde, AnalysisReport};
use codescan_core::db::ScanRecord;
use codescan_core::model::Category;
use codescan_core::services::default_scanner_registry;
use tracing::warn;

use crate::commands::{format_bytes, ScanSetup};
use crate::{sha256_file, timestamp_now};

/// Options for `codescan scan`.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub root: String,
    pub path: PathBuf,
    pub start: u64,
    pub end: u64,
    pub aggressive: bool,
    pub backend: Option<String>,
    pub json: bool,
    /// Skip storing the result even inside a workspace.
    pub no_record: bool,
}

/// Scan one file window and print the verdict.
pub fn scan_command(options: ScanOptions) -> Result<()> {
    let setup = ScanSetup::load(&options.root, options.backend.as_deref())?;
    let registry = default_scanner_registry();
    let mut handle = setup.open_scanner(&registry)?;

    let aggressive = options.aggressive || setup.analysis.aggressive;
    let path = resolve_binary_path(&options.path);
    let report = analyze(&mut handle, &path, options.start, options.end, aggressive)?;
    handle.shutdown();

    if !options.no_record {
        record_scan(&setup, &report)?;
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Store `report` when the setup has a results database.
pub fn record_scan(setup: &ScanSetup, report: &AnalysisReport) -> Result<()> {
    let Some(db) = setup.db() else {
        return Ok(());
    };
    let sha256 = match sha256_file(&report.path) {
        Ok(digest) => Some(digest),
        Err(err) => {
            warn!(path = %report.path.display(), "hashing failed: {err:#}");
            None
        }
    };
    let record = ScanRecord::from_report(report, sha256, timestamp_now());
    db.insert_scan(&record).context("Failed to store scan result")?;
    Ok(())
}

/// Absolute form of a user-supplied binary path.
pub fn resolve_binary_path(path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    expanded.canonicalize().unwrap_or(expanded)
}

fn print_report(report: &AnalysisReport) {
    println!("File: {}", report.path.display());
    println!("Size: {}", format_bytes(report.file_size));
    if report.window.is_whole_file() {
        println!("Window: whole file");
    } else {
        println!("Window: {:#x}..{:#x}", report.window.start, report.window.end);
    }
    println!("Header: {}", report.header.map(|h| h.as_str()).unwrap_or("none"));
    println!("Backend: {} ({})", report.backend, report.backend_version);
    println!("Verdict: {}", report.verdict);
    if let Some(label) = &report.code_label {
        println!("Architecture: {}", label);
    }

    let Some(sizes) = &report.sizes else {
        println!("Sizes: (scanner found no regions)");
        return;
    };
    println!("Sizes:");
    for category in Category::SCANNED {
        let bytes = sizes.get(category);
        if bytes == 0 {
            continue;
        }
        println!(
            "  {:<12} {:>10}  {:>5.1}%",
            category.as_str(),
            bytes,
            100.0 * sizes.ratio(category)
        );
    }
    println!("  {:<12} {:>10}", "FileSize", sizes.file_size);
    if let Some(decision) = &report.decision {
        if decision.packed_certainty > 0.0 {
            println!("Packed certainty: {:.2}", decision.packed_certainty);
        }
    }
}
