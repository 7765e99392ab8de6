use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisReport, ComparisonReport, ReconcileOutcome, SizeSummary};

/// One stored scan of a file window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRecord {
    pub path: String,
    /// SHA-256 of the file contents, when the caller computed it.
    pub sha256: Option<String>,
    pub file_size: u64,
    pub window_start: u64,
    pub window_end: u64,
    pub header: Option<String>,
    pub backend: String,
    /// Short verdict code, e.g. `(P)`.
    pub verdict: String,
    pub architecture: Option<String>,
    pub sizes: Option<SizeSummary>,
    pub scanned_at: String,
}

impl ScanRecord {
    pub fn from_report(
        report: &AnalysisReport,
        sha256: Option<String>,
        scanned_at: String,
    ) -> Self {
        Self {
            path: report.path.display().to_string(),
            sha256,
            file_size: report.file_size,
            window_start: report.window.start,
            window_end: report.window.end,
            header: report.header.map(|h| h.as_str().to_string()),
            backend: report.backend.clone(),
            verdict: report.verdict.code().to_string(),
            architecture: report.code_label.clone(),
            sizes: report.sizes,
            scanned_at,
        }
    }
}

/// One stored alien-code comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComparisonRecord {
    pub path: String,
    pub confirmed_bytes: u64,
    pub alien_bytes: u64,
    pub alien_label: String,
    /// `reconciled`, or the skip reason.
    pub outcome: String,
    pub compared_at: String,
}

impl ComparisonRecord {
    pub fn from_report(report: &ComparisonReport, compared_at: String) -> Self {
        let outcome = match &report.reconciliation.outcome {
            ReconcileOutcome::Reconciled => "reconciled".to_string(),
            ReconcileOutcome::Skipped(reason) => format!("skipped: {reason}"),
        };
        Self {
            path: report.path.display().to_string(),
            confirmed_bytes: report.confirmed_bytes,
            alien_bytes: report.alien_bytes,
            alien_label: report.reconciliation.alien_label.clone(),
            outcome,
            compared_at,
        }
    }
}
