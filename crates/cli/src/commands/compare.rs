use std::path::Path;

use anyhow::{Context, Result};
use codescan_core::analysis::{compare, ComparisonReport, ReconcileOutcome};
use codescan_core::db::ComparisonRecord;
use codescan_core::model::Category;
use codescan_core::services::default_scanner_registry;

use crate::commands::{format_bytes, resolve_binary_path, ScanSetup};
use crate::timestamp_now;

/// Reconcile scanner code of `path` against its declared executable sections.
pub fn compare_command(
    root: &str,
    path: &Path,
    backend: Option<&str>,
    json: bool,
    no_record: bool,
) -> Result<()> {
    let setup = ScanSetup::load(root, backend)?;
    let registry = default_scanner_registry();
    let mut handle = setup.open_scanner(&registry)?;
    let report = compare(&mut handle, &resolve_binary_path(path))?;
    handle.shutdown();

    if let (Some(db), false) = (setup.db(), no_record) {
        let record = ComparisonRecord::from_report(&report, timestamp_now());
        db.insert_comparison(&record).context("Failed to store comparison result")?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_comparison(&report);
    }
    Ok(())
}

fn print_comparison(report: &ComparisonReport) {
    println!("File: {}", report.path.display());
    println!("Size: {}", format_bytes(report.file_size));
    println!("Header: {}", report.header.map(|h| h.as_str()).unwrap_or("none"));

    println!("Executable sections ({}):", report.sections.len());
    for (name, ranges) in &report.sections {
        for range in ranges {
            println!("  {:<12} {}", name, range);
        }
    }
    if !report.sections_within_file {
        println!("  (some sections extend past the end of the file)");
    }

    match &report.reconciliation.outcome {
        ReconcileOutcome::Reconciled => {
            println!("Confirmed code: {}", format_bytes(report.confirmed_bytes));
            println!(
                "Alien code: {} [{}]",
                format_bytes(report.alien_bytes),
                report.reconciliation.alien_label
            );
            for region in report.reconciliation.regions.get(Category::AlienCode) {
                println!("  {}", region.interval);
            }
        }
        ReconcileOutcome::Skipped(reason) => {
            println!("Comparison skipped: {reason}");
        }
    }
}
