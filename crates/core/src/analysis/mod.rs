//! Post-processing of scanner output.
//!
//! - `sizes`: per-category byte totals.
//! - `decision`: packed/normal/data/corrupt heuristic.
//! - `alien`: scanner code vs. declared executable sections.
//! - `pipeline`: the end-to-end analysis and comparison of one file.

pub mod alien;
pub mod decision;
pub mod pipeline;
pub mod sizes;

use std::path::PathBuf;

use thiserror::Error;

use crate::regions::RegionError;
use crate::services::{HeaderError, ScanError};

pub use alien::{reconcile, ReconcileOutcome, Reconciliation, SectionMap, SkipReason};
pub use decision::{decide, evaluate, DecisionReport, FileVerdict};
pub use pipeline::{
    analyze, compare, expand_tilde, parse_offset, sanitize_offsets, AnalysisReport,
    ComparisonReport, ScanWindow,
};
pub use sizes::{sizes, SizeSummary};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Source file does not exist: {0}")]
    MissingBinary(PathBuf),
    #[error("Source file is empty: {0}")]
    EmptyBinary(PathBuf),
    #[error("Size summary has no FileSize aggregate")]
    MissingAggregate,
    #[error("Malformed region data: {0}")]
    MalformedRegionData(#[from] RegionError),
    #[error("Scanner failure: {0}")]
    External(ScanError),
    #[error(transparent)]
    Header(#[from] HeaderError),
}

impl AnalysisError {
    /// Errors caused by the caller's input rather than the data or the
    /// scanner; frontends map these to a usage failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidInput(_)
                | AnalysisError::MissingBinary(_)
                | AnalysisError::EmptyBinary(_)
        )
    }
}

impl From<ScanError> for AnalysisError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::MissingBinary(path) => AnalysisError::MissingBinary(path),
            ScanError::EmptyBinary(path) => AnalysisError::EmptyBinary(path),
            other => AnalysisError::External(other),
        }
    }
}
