use anyhow::{Context, Result};
use codescan_core::db::{ComparisonRecord, ScanRecord, WorkspaceContext};
use serde::Serialize;

use crate::canonicalize_or_current;
use crate::commands::resolve_binary_path;

#[derive(Debug, Serialize)]
pub struct History {
    pub scans: Vec<ScanRecord>,
    pub comparisons: Vec<ComparisonRecord>,
}

/// List stored scans and comparisons, optionally for one file.
pub fn history_command(root: &str, path: Option<&str>, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let WorkspaceContext { db, .. } = WorkspaceContext::from_root(&root_path)?;

    let filter = path.map(|p| resolve_binary_path(p.as_ref()).display().to_string());
    let history = History {
        scans: db.list_scans(filter.as_deref()).context("Failed to list scans")?,
        comparisons: db
            .list_comparisons(filter.as_deref())
            .context("Failed to list comparisons")?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    println!("Scans ({}):", history.scans.len());
    if history.scans.is_empty() {
        println!("  (none)");
    }
    for scan in &history.scans {
        let arch = scan.architecture.as_deref().unwrap_or("-");
        println!(
            "  - {} {} [{}] {} via {}",
            scan.scanned_at, scan.verdict, arch, scan.path, scan.backend
        );
    }

    println!("Comparisons ({}):", history.comparisons.len());
    if history.comparisons.is_empty() {
        println!("  (none)");
    }
    for cmp in &history.comparisons {
        println!(
            "  - {} {} confirmed={} alien={} [{}] {}",
            cmp.compared_at,
            cmp.path,
            cmp.confirmed_bytes,
            cmp.alien_bytes,
            cmp.alien_label,
            cmp.outcome
        );
    }
    Ok(())
}
