//! Split scanner-detected code into code confirmed by the declared executable
//! sections and "alien" code living outside all of them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::AnalysisError;
use crate::model::{Category, Interval, Region, RegionSet};
use crate::regions::{combine, to_digital, to_mask, MaskOp};

/// Declared executable sections: section name -> file offset ranges.
pub type SectionMap = BTreeMap<String, Vec<Interval>>;

/// Why a reconciliation was not attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NoSections,
    NoCode,
    SectionOutsideFile { section: String, end: u64, file_size: u64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSections => f.write_str("no executable sections declared"),
            SkipReason::NoCode => f.write_str("scanner found no code"),
            SkipReason::SectionOutsideFile { section, end, file_size } => write!(
                f,
                "section '{section}' ends at {end:#x}, past the file size {file_size:#x}"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Reconciled,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub regions: RegionSet,
    pub outcome: ReconcileOutcome,
    /// Architecture label of the last alien piece, or `AlienCode`.
    pub alien_label: String,
}

impl Reconciliation {
    fn skipped(regions: &RegionSet, reason: SkipReason) -> Self {
        info!(%reason, "skipping alien code search");
        Self {
            regions: regions.clone(),
            outcome: ReconcileOutcome::Skipped(reason),
            alien_label: Category::AlienCode.as_str().to_string(),
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.outcome == ReconcileOutcome::Reconciled
    }
}

/// True when every declared section ends within `file_size`.
pub fn sections_within_file(sections: &SectionMap, file_size: u64) -> bool {
    first_section_outside(sections, file_size).is_none()
}

fn first_section_outside(sections: &SectionMap, file_size: u64) -> Option<(String, u64)> {
    sections.iter().find_map(|(name, ranges)| {
        ranges.iter().find(|iv| iv.end > file_size).map(|iv| (name.clone(), iv.end))
    })
}

/// Reconcile scanner code regions against declared executable sections.
///
/// `Code` in the result holds the code bytes covered by some section and
/// `AlienCode` the rest. Pieces lying inside an original code region inherit
/// its architecture. The input is returned unchanged (as a skip) when there is
/// nothing to compare or a section points past the end of the file.
pub fn reconcile(
    regions: &RegionSet,
    sections: &SectionMap,
    file_size: u64,
) -> Result<Reconciliation, AnalysisError> {
    let declared: Vec<Interval> = sections.values().flatten().copied().collect();
    if declared.is_empty() {
        return Ok(Reconciliation::skipped(regions, SkipReason::NoSections));
    }
    let code = regions.get(Category::Code);
    if code.is_empty() {
        return Ok(Reconciliation::skipped(regions, SkipReason::NoCode));
    }
    if let Some((section, end)) = first_section_outside(sections, file_size) {
        return Ok(Reconciliation::skipped(
            regions,
            SkipReason::SectionOutsideFile { section, end, file_size },
        ));
    }

    let len = usize::try_from(file_size).map_err(|_| {
        AnalysisError::InvalidInput(format!("file size {file_size} exceeds addressable memory"))
    })?;
    let code_intervals = regions.intervals(Category::Code);

    let alien = to_digital(&combine(
        &declared,
        len,
        MaskOp::Difference,
        Some(to_mask(&code_intervals, len)),
    )?);
    let confirmed = to_digital(&combine(
        &declared,
        len,
        MaskOp::Intersection,
        Some(to_mask(&code_intervals, len)),
    )?);

    let confirmed = inherit_architecture(code, confirmed);
    let alien = inherit_architecture(code, alien);
    debug!(confirmed = confirmed.len(), alien = alien.len(), "alien code search finished");

    let alien_label = alien
        .last()
        .and_then(|r| r.architecture.as_ref())
        .map(|a| a.full_label())
        .unwrap_or_else(|| Category::AlienCode.as_str().to_string());

    let mut out = regions.clone();
    out.insert(Category::Code, confirmed);
    out.insert(Category::AlienCode, alien);
    Ok(Reconciliation { regions: out, outcome: ReconcileOutcome::Reconciled, alien_label })
}

fn inherit_architecture(originals: &[Region], pieces: Vec<Interval>) -> Vec<Region> {
    pieces
        .into_iter()
        .map(|piece| {
            let architecture = originals
                .iter()
                .rev()
                .find(|r| r.interval.contains(&piece))
                .and_then(|r| r.architecture.clone());
            Region { interval: piece, architecture }
        })
        .collect()
}
