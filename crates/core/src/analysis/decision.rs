//! Packing heuristic over the size summary of a scan.
//!
//! The classifier only looks at category shares of the scanned window and at
//! whether a structural header was recognized. Thresholds are strict (`>`)
//! shares of `FileSize`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::sizes::SizeSummary;
use crate::analysis::AnalysisError;

/// Windows below this many bytes use the most lenient packing veto.
pub const TINY_FILE: u64 = 20_000;
/// Windows below this many bytes use the middle packing veto.
pub const SMALL_FILE: u64 = 50_000;

/// Verdict for one scanned window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileVerdict {
    Unknown,
    Corrupt,
    Packed,
    Normal,
    NoEvaluationPossible,
    Data,
}

impl FileVerdict {
    pub const ALL: [FileVerdict; 6] = [
        FileVerdict::Unknown,
        FileVerdict::Corrupt,
        FileVerdict::Packed,
        FileVerdict::Normal,
        FileVerdict::NoEvaluationPossible,
        FileVerdict::Data,
    ];

    /// Short code shown in reports, e.g. `(P)`.
    pub fn code(self) -> &'static str {
        match self {
            FileVerdict::Unknown => "(U)",
            FileVerdict::Corrupt => "(C)",
            FileVerdict::Packed => "(P)",
            FileVerdict::Normal => "(N)",
            FileVerdict::NoEvaluationPossible => "(X)",
            FileVerdict::Data => "(D)",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FileVerdict::Unknown => "Unknown data",
            FileVerdict::Corrupt => "Corrupt, do not use",
            FileVerdict::Packed => "Packed",
            FileVerdict::Normal => "Normal",
            FileVerdict::NoEvaluationPossible => "No evaluation possible",
            FileVerdict::Data => "Data, for sure",
        }
    }
}

impl fmt::Display for FileVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.description())
    }
}

impl FromStr for FileVerdict {
    type Err = String;

    /// Accepts the short code (`(P)`, `P`) or the variant name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.trim_start_matches('(').trim_end_matches(')');
        FileVerdict::ALL
            .into_iter()
            .find(|v| {
                v.code().trim_start_matches('(').trim_end_matches(')') == bare
                    || format!("{v:?}") == trimmed
            })
            .ok_or_else(|| format!("unknown verdict '{s}'"))
    }
}

/// Verdict plus every intermediate signal that led to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub verdict: FileVerdict,
    pub has_header: bool,
    pub is_tiny: bool,
    pub is_small: bool,
    /// Code above 1% of the window.
    pub code_exists: bool,
    /// Code above 5%.
    pub code_minimum: bool,
    /// Code above 20%.
    pub code_sufficient: bool,
    /// High-entropy blocks above 40%.
    pub big_high_entropy: bool,
    /// Weighted evidence against code: `HighEntropy + 0.3 * Data`, capped at
    /// the window size.
    pub code_antithesis: f64,
    pub veto_i: bool,
    pub veto_ii: bool,
    pub veto_iii: bool,
    pub zero_percent: f64,
    pub too_many_zeros: bool,
    /// `code_antithesis / (0.5 * FileSize)` for packed verdicts, else 0.
    pub packed_certainty: f64,
}

/// Classify a window. Deterministic for equal inputs.
pub fn decide(sizes: &SizeSummary, has_header: bool) -> Result<FileVerdict, AnalysisError> {
    evaluate(sizes, has_header).map(|report| report.verdict)
}

/// Run the heuristic and keep its intermediate signals.
pub fn evaluate(sizes: &SizeSummary, has_header: bool) -> Result<DecisionReport, AnalysisError> {
    if sizes.file_size == 0 {
        return Err(AnalysisError::MissingAggregate);
    }

    let total = sizes.file_size as f64;
    let above = |bytes: u64, share: f64| bytes as f64 > share * total;

    let is_tiny = sizes.file_size < TINY_FILE;
    let is_small = sizes.file_size < SMALL_FILE;
    let code_exists = above(sizes.code, 0.01);
    let code_minimum = above(sizes.code, 0.05);
    let code_sufficient = above(sizes.code, 0.2);
    let big_high_entropy = above(sizes.high_entropy, 0.4);

    let zero_percent = 100.0 * sizes.zero as f64 / total;
    let too_many_zeros = zero_percent > 25.0;

    let code_antithesis = (sizes.high_entropy as f64 + 0.3 * sizes.data as f64).min(total);
    let veto_i = code_antithesis > 0.2 * total;
    let veto_ii = code_antithesis > 0.3 * total;
    let veto_iii = code_antithesis > 0.4 * total;

    let code_or_header = code_exists || has_header;
    let corrupt = above(sizes.code, 0.9);
    let packed = ((is_tiny && veto_iii) || (is_small && veto_ii) || veto_i)
        && code_or_header
        && !code_sufficient;

    let verdict = if corrupt {
        FileVerdict::Corrupt
    } else if packed {
        // A large high-entropy block outweighed by code is likely resources.
        if sizes.code > sizes.high_entropy && big_high_entropy {
            FileVerdict::Normal
        } else {
            FileVerdict::Packed
        }
    } else if code_sufficient
        || (code_minimum && is_tiny)
        || (code_minimum && (sizes.high_entropy as f64) < 0.1 * total)
    {
        FileVerdict::Normal
    } else if !code_or_header {
        FileVerdict::Data
    } else {
        FileVerdict::Unknown
    };

    let packed_certainty =
        if verdict == FileVerdict::Packed { code_antithesis / (0.5 * total) } else { 0.0 };

    Ok(DecisionReport {
        verdict,
        has_header,
        is_tiny,
        is_small,
        code_exists,
        code_minimum,
        code_sufficient,
        big_high_entropy,
        code_antithesis,
        veto_i,
        veto_ii,
        veto_iii,
        zero_percent,
        too_many_zeros,
        packed_certainty,
    })
}
