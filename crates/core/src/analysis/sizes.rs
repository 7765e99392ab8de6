use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;
use crate::model::{Category, RegionSet};

/// Per-category byte totals of one scan window.
///
/// `file_size` is the sum over all categories, i.e. the scanned window size,
/// which only equals the real file size for whole-file scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SizeSummary {
    pub ascii: u64,
    pub code: u64,
    pub data: u64,
    pub file_size: u64,
    pub high_entropy: u64,
    pub zero: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alien_code: Option<u64>,
}

impl SizeSummary {
    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Ascii => self.ascii,
            Category::Code => self.code,
            Category::Data => self.data,
            Category::HighEntropy => self.high_entropy,
            Category::Zero => self.zero,
            Category::AlienCode => self.alien_code.unwrap_or(0),
        }
    }

    /// Share of `category` in the window, 0.0 for an empty window.
    pub fn ratio(&self, category: Category) -> f64 {
        if self.file_size == 0 {
            return 0.0;
        }
        self.get(category) as f64 / self.file_size as f64
    }

    /// Rebuild a summary from a loose `name -> bytes` map such as a stored
    /// JSON report. Missing categories default to 0; a missing `FileSize` is
    /// an error because every ratio depends on it.
    pub fn from_map(map: &BTreeMap<String, u64>) -> Result<Self, AnalysisError> {
        let file_size = *map.get("FileSize").ok_or(AnalysisError::MissingAggregate)?;
        let field = |name: &str| map.get(name).copied().unwrap_or(0);
        Ok(Self {
            ascii: field("Ascii"),
            code: field("Code"),
            data: field("Data"),
            file_size,
            high_entropy: field("HighEntropy"),
            zero: field("Zero"),
            alien_code: map.get("AlienCode").copied(),
        })
    }

    pub fn to_map(&self) -> BTreeMap<String, u64> {
        let mut map = BTreeMap::new();
        for category in Category::SCANNED {
            map.insert(category.as_str().to_string(), self.get(category));
        }
        map.insert("FileSize".to_string(), self.file_size);
        if let Some(alien) = self.alien_code {
            map.insert(Category::AlienCode.as_str().to_string(), alien);
        }
        map
    }
}

/// Sum `end - start` per category.
///
/// The five scanner categories are always reported; `AlienCode` only when the
/// set carries it. An empty set is rejected since there is nothing to size.
pub fn sizes(regions: &RegionSet) -> Result<SizeSummary, AnalysisError> {
    if regions.is_empty() {
        return Err(AnalysisError::InvalidInput("no regions to size".to_string()));
    }

    let mut summary = SizeSummary::default();
    for (category, list) in regions.iter() {
        let total: u64 = list.iter().map(|r| r.len()).sum();
        match category {
            Category::Ascii => summary.ascii = total,
            Category::Code => summary.code = total,
            Category::Data => summary.data = total,
            Category::HighEntropy => summary.high_entropy = total,
            Category::Zero => summary.zero = total,
            Category::AlienCode => summary.alien_code = Some(total),
        }
        summary.file_size += total;
    }
    Ok(summary)
}
