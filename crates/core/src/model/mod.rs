//! Region model shared by the scanner adapters, the region algebra and the
//! decision engine.
//!
//! - `Category`: the content class of a byte range.
//! - `Interval`: a half-open byte range `[start, end)`.
//! - `Architecture`: ISA/bitness/endianness attached to code regions.
//! - `Region`: an interval plus optional architecture metadata.
//! - `RegionSet`: category -> regions, the unit every pipeline stage consumes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Content class assigned to a byte range.
///
/// Declaration order is alphabetical so that `RegionSet` iteration matches the
/// sorted category names used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Code found outside every declared executable section.
    AlienCode,
    Ascii,
    Code,
    /// Generic, unclassified data.
    Data,
    HighEntropy,
    Zero,
}

impl Category {
    /// Categories the scanner itself can produce (everything but `AlienCode`).
    pub const SCANNED: [Category; 5] =
        [Category::Ascii, Category::Code, Category::Data, Category::HighEntropy, Category::Zero];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::AlienCode => "AlienCode",
            Category::Ascii => "Ascii",
            Category::Code => "Code",
            Category::Data => "Data",
            Category::HighEntropy => "HighEntropy",
            Category::Zero => "Zero",
        }
    }

    /// Whether regions of this category carry architecture metadata.
    pub fn is_code(self) -> bool {
        matches!(self, Category::Code | Category::AlienCode)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AlienCode" => Ok(Category::AlienCode),
            "Ascii" => Ok(Category::Ascii),
            "Code" => Ok(Category::Code),
            "Data" => Ok(Category::Data),
            "HighEntropy" => Ok(Category::HighEntropy),
            "Zero" => Ok(Category::Zero),
            other => Err(format!("unknown region category '{other}'")),
        }
    }
}

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Build an interval from offsets the caller already knows to be ordered.
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Build an interval, rejecting empty or inverted ranges.
    pub fn checked(start: u64, end: u64) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when `other` lies completely inside `self`.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}..{:#x}", self.start, self.end)
    }
}

/// Byte order reported by the scanner for a code region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    #[default]
    Unknown,
    Little,
    Big,
}

impl Endianness {
    /// Decode the scanner's numeric encoding (0 unknown, 1 little, 2 big).
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Endianness::Little,
            2 => Endianness::Big,
            _ => Endianness::Unknown,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Endianness::Unknown => 0,
            Endianness::Little => 1,
            Endianness::Big => 2,
        }
    }

    /// Short label used in architecture strings (`le`, `be`, or empty).
    pub fn short_label(self) -> &'static str {
        match self {
            Endianness::Unknown => "",
            Endianness::Little => "le",
            Endianness::Big => "be",
        }
    }
}

/// Architecture metadata the scanner attaches to code regions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Architecture {
    /// Instruction set name in scanner terminology (e.g. `Intel`, `Arm`, `Mips`).
    pub isa: String,
    /// 16/32/64, or 0 when unknown.
    pub bitness: u32,
    pub endianness: Endianness,
}

impl Architecture {
    pub fn new(isa: impl Into<String>, bitness: u32, endianness: Endianness) -> Self {
        Self { isa: isa.into(), bitness, endianness }
    }

    /// Combined label such as `Intel-64`, `Mips-32-be` or `AMD-be`.
    ///
    /// Endianness is omitted for Intel, which is always little-endian.
    pub fn full_label(&self) -> String {
        let mut label = self.isa.clone();
        if self.bitness > 0 {
            label.push('-');
            label.push_str(&self.bitness.to_string());
        }
        let endian = self.endianness.short_label();
        if !endian.is_empty() && self.isa != "Intel" {
            label.push('-');
            label.push_str(endian);
        }
        label
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_label())
    }
}

/// Flattened architecture description as shown in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureInfo {
    #[serde(rename = "ISA")]
    pub isa: String,
    #[serde(rename = "Bitness")]
    pub bitness: String,
    #[serde(rename = "Endianess")]
    pub endianness: String,
    #[serde(rename = "Full")]
    pub full: String,
}

impl From<&Architecture> for ArchitectureInfo {
    fn from(arch: &Architecture) -> Self {
        Self {
            isa: arch.isa.clone(),
            bitness: if arch.bitness > 0 { arch.bitness.to_string() } else { String::new() },
            endianness: arch.endianness.short_label().to_string(),
            full: arch.full_label(),
        }
    }
}

/// A byte range plus the architecture tag carried by code regions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    #[serde(flatten)]
    pub interval: Interval,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<Architecture>,
}

impl Region {
    pub fn plain(start: u64, end: u64) -> Self {
        Self { interval: Interval::new(start, end), architecture: None }
    }

    pub fn code(start: u64, end: u64, architecture: Architecture) -> Self {
        Self { interval: Interval::new(start, end), architecture: Some(architecture) }
    }

    pub fn start(&self) -> u64 {
        self.interval.start
    }

    pub fn end(&self) -> u64 {
        self.interval.end
    }

    pub fn len(&self) -> u64 {
        self.interval.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interval.is_empty()
    }
}

/// Category -> regions mapping produced by one scan.
///
/// Before merging no ordering or disjointness is guaranteed. After
/// `regions::sanitize` every list is sorted by start and no two regions of the
/// same category touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionSet {
    categories: BTreeMap<Category, Vec<Region>>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper, mainly for tests and fixtures.
    pub fn with(mut self, category: Category, regions: Vec<Region>) -> Self {
        self.insert(category, regions);
        self
    }

    /// Replace the regions stored for `category`.
    pub fn insert(&mut self, category: Category, regions: Vec<Region>) {
        self.categories.insert(category, regions);
    }

    /// Append one region, creating the category if absent.
    pub fn push(&mut self, category: Category, region: Region) {
        self.categories.entry(category).or_default().push(region);
    }

    /// Regions for `category`; empty when the category is absent.
    pub fn get(&self, category: Category) -> &[Region] {
        self.categories.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, category: Category) -> bool {
        self.categories.contains_key(&category)
    }

    /// Categories present in the set, in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[Region])> + '_ {
        self.categories.iter().map(|(c, r)| (*c, r.as_slice()))
    }

    /// Plain intervals of one category, metadata dropped.
    pub fn intervals(&self, category: Category) -> Vec<Interval> {
        self.get(category).iter().map(|r| r.interval).collect()
    }

    /// Total number of regions across all categories.
    pub fn region_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// True when no category holds a region.
    pub fn is_empty(&self) -> bool {
        self.region_count() == 0
    }

    /// Architecture details of the first code region, if any.
    pub fn architecture(&self) -> Option<ArchitectureInfo> {
        self.get(Category::Code)
            .first()
            .and_then(|r| r.architecture.as_ref())
            .map(ArchitectureInfo::from)
    }

    /// Sorted, de-duplicated architecture labels of all code regions joined
    /// with `", "`; `None` when no code region carries metadata.
    pub fn code_label(&self) -> Option<String> {
        let mut labels: Vec<String> = self
            .get(Category::Code)
            .iter()
            .filter_map(|r| r.architecture.as_ref())
            .map(Architecture::full_label)
            .filter(|l| !l.is_empty())
            .collect();
        labels.sort();
        labels.dedup();
        if labels.is_empty() {
            None
        } else {
            Some(labels.join(", "))
        }
    }
}
