use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::alien::{reconcile, sections_within_file, Reconciliation, SectionMap};
use crate::analysis::decision::{evaluate, DecisionReport, FileVerdict};
use crate::analysis::sizes::{sizes, SizeSummary};
use crate::analysis::AnalysisError;
use crate::model::{ArchitectureInfo, Category, RegionSet};
use crate::regions::sanitize;
use crate::services::{
    detect_header, executable_sections, HeaderKind, ScanRequest, ScannerHandle,
};

/// Byte window handed to the scanner. `(0, 0)` stands for the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanWindow {
    pub start: u64,
    pub end: u64,
}

impl ScanWindow {
    pub fn whole_file() -> Self {
        Self::default()
    }

    pub fn is_whole_file(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Number of scanned bytes for a file of `file_size` bytes.
    pub fn len(&self, file_size: u64) -> u64 {
        if self.is_whole_file() {
            file_size
        } else {
            self.end - self.start
        }
    }
}

/// Result of analyzing one file window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub path: PathBuf,
    pub file_size: u64,
    pub window: ScanWindow,
    pub header: Option<HeaderKind>,
    pub backend: String,
    pub backend_version: String,
    pub regions: RegionSet,
    /// Absent when the scanner found nothing to classify.
    pub sizes: Option<SizeSummary>,
    pub decision: Option<DecisionReport>,
    pub verdict: FileVerdict,
    pub architecture: Option<ArchitectureInfo>,
    /// Legend label for code: all distinct architectures, sorted.
    pub code_label: Option<String>,
}

/// Alien-code comparison of one whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub path: PathBuf,
    pub file_size: u64,
    pub header: Option<HeaderKind>,
    pub architecture: Option<ArchitectureInfo>,
    pub sections: SectionMap,
    pub sections_within_file: bool,
    pub reconciliation: Reconciliation,
    pub confirmed_bytes: u64,
    pub alien_bytes: u64,
}

/// Replace a leading `~` with the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal offset.
pub fn parse_offset(value: &str) -> Result<u64, AnalysisError> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| AnalysisError::InvalidInput(format!("Offset '{value}' is not a number")))
}

/// Validate user offsets against the file size.
pub fn sanitize_offsets(start: u64, end: u64, file_size: u64) -> Result<ScanWindow, AnalysisError> {
    if start == 0 && end == 0 {
        return Ok(ScanWindow::whole_file());
    }
    if start >= end {
        return Err(AnalysisError::InvalidInput(format!(
            "Start offset {start:#x} is >= end offset {end:#x}"
        )));
    }
    if start >= file_size {
        return Err(AnalysisError::InvalidInput(format!(
            "Start offset {start:#x} is >= the file size {file_size:#x}"
        )));
    }
    if end > file_size {
        warn!(end, file_size, "end offset past end of file, clamping");
        return Ok(ScanWindow { start, end: file_size });
    }
    Ok(ScanWindow { start, end })
}

fn checked_file_size(path: &Path) -> Result<u64, AnalysisError> {
    let meta = fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .ok_or_else(|| AnalysisError::MissingBinary(path.to_path_buf()))?;
    if meta.len() == 0 {
        return Err(AnalysisError::EmptyBinary(path.to_path_buf()));
    }
    Ok(meta.len())
}

/// Scan `path` and run merge, padding, sizing and the decision heuristic.
///
/// When the scanner reports no regions at all the verdict is
/// [`FileVerdict::NoEvaluationPossible`] and no sizes are reported.
pub fn analyze(
    handle: &mut ScannerHandle<'_>,
    path: &Path,
    start: u64,
    end: u64,
    aggressive: bool,
) -> Result<AnalysisReport, AnalysisError> {
    let path = expand_tilde(path);
    let file_size = checked_file_size(&path)?;
    let window = sanitize_offsets(start, end, file_size)?;
    let header = detect_header(&path)?;

    let request =
        ScanRequest { path: path.clone(), start: window.start, end: window.end, aggressive };
    let raw = handle.scan(&request)?;

    let mut report = AnalysisReport {
        path,
        file_size,
        window,
        header,
        backend: handle.backend_name().to_string(),
        backend_version: handle.version().to_string(),
        regions: RegionSet::new(),
        sizes: None,
        decision: None,
        verdict: FileVerdict::NoEvaluationPossible,
        architecture: None,
        code_label: None,
    };

    if raw.is_empty() {
        info!(path = %report.path.display(), "scanner returned no regions");
        return Ok(report);
    }

    let regions = sanitize(&raw, window.len(file_size));
    let summary = sizes(&regions)?;
    let decision = evaluate(&summary, header.is_some())?;
    debug!(
        verdict = decision.verdict.code(),
        file_size = summary.file_size,
        code = summary.code,
        high_entropy = summary.high_entropy,
        "decision made"
    );

    report.architecture = regions.architecture();
    report.code_label = regions.code_label();
    report.verdict = decision.verdict;
    report.sizes = Some(summary);
    report.decision = Some(decision);
    report.regions = regions;
    Ok(report)
}

/// Analyze the whole file and reconcile its code against the executable
/// sections declared by the object header.
pub fn compare(
    handle: &mut ScannerHandle<'_>,
    path: &Path,
) -> Result<ComparisonReport, AnalysisError> {
    let analysis = analyze(handle, path, 0, 0, false)?;
    let sections = executable_sections(&analysis.path)?;
    let reconciliation = reconcile(&analysis.regions, &sections, analysis.file_size)?;

    let total = |category| -> u64 {
        reconciliation.regions.get(category).iter().map(|r| r.len()).sum()
    };
    let confirmed_bytes = total(Category::Code);
    let alien_bytes = total(Category::AlienCode);

    Ok(ComparisonReport {
        sections_within_file: sections_within_file(&sections, analysis.file_size),
        path: analysis.path,
        file_size: analysis.file_size,
        header: analysis.header,
        architecture: analysis.architecture,
        sections,
        reconciliation,
        confirmed_bytes,
        alien_bytes,
    })
}
