//! Plain layout data for colour-map plots of a scan.
//!
//! Nothing here draws pixels: a plotting frontend receives a [`ColorBar`] with
//! the coloured areas, axis bounds, ticks and legend entries and renders it
//! however it likes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{AnalysisReport, SectionMap};
use crate::model::{Category, RegionSet};

/// Files below this size have no meaningful byte axis.
pub const MIN_FILE_SIZE: u64 = 0x100;

/// Target upper bound for the number of axis ticks.
const MAX_TICKS: f64 = 50.0;

/// Tick spacing grows in steps of this many bytes.
const TICK_STEP: u64 = 0x100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("file of {size} bytes is too small for visualization (minimum {min})")]
    TooSmall { size: u64, min: u64 },
}

/// Colour and label of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaSpec {
    pub id: Category,
    pub label: String,
    pub dot_color: String,
    pub line_color: String,
}

impl AreaSpec {
    fn new(id: Category, label: &str, dot_color: &str, line_color: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            dot_color: dot_color.to_string(),
            line_color: line_color.to_string(),
        }
    }
}

/// Palette in legend order.
pub fn default_area_specs() -> Vec<AreaSpec> {
    vec![
        AreaSpec::new(Category::Code, "Code", "#00bfbf", "#0022cc"),
        AreaSpec::new(Category::AlienCode, "Alien Code", "#00533f", "#007760"),
        AreaSpec::new(Category::Ascii, "Ascii/Strings", "#e04000", "#601000"),
        AreaSpec::new(Category::HighEntropy, "High-Entropy", "#3d0089", "k"),
        AreaSpec::new(Category::Zero, "Padding/Zero", "#c0c0c0", "#5d5d5d"),
        AreaSpec::new(Category::Data, "Generic Data", "#bfbf00", "#323300"),
    ]
}

/// One coloured span of the bar, in window-relative offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    pub start: u64,
    pub end: u64,
    pub category: Category,
    pub color: String,
}

/// Declared executable section drawn on its own track above the bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBar {
    pub title: String,
    pub axis_label: String,
    pub areas: Vec<Area>,
    /// Area starts followed by the end of the last area.
    pub bounds: Vec<u64>,
    pub resolution: u64,
    pub ticks: Vec<u64>,
    /// Hex labels, shifted by the window start so they show file offsets.
    pub tick_labels: Vec<String>,
    pub legend: Vec<AreaSpec>,
    /// Sorted by start and clipped to the window; empty unless sections were given.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionSpan>,
}

/// Tick spacing for a window of `size` bytes.
///
/// Starts at 0x100 and grows by 0x100 until at most ~50 ticks remain; the
/// step that satisfies the bound is itself advanced once more.
pub fn tick_resolution(size: u64) -> u64 {
    let mut resolution = TICK_STEP;
    if size > TICK_STEP {
        let mut ticks = size as f64;
        while ticks > MAX_TICKS {
            ticks = size as f64 / resolution as f64;
            resolution += TICK_STEP;
        }
    }
    resolution
}

/// Builder for the colour bar of one scan.
#[derive(Debug, Clone)]
pub struct ColorMap<'a> {
    name: String,
    file_size: u64,
    window_start: u64,
    window_size: u64,
    regions: &'a RegionSet,
    specs: Vec<AreaSpec>,
    sections: Vec<SectionSpan>,
}

impl<'a> ColorMap<'a> {
    /// Whole-file colour map of `regions`.
    pub fn new(name: impl Into<String>, file_size: u64, regions: &'a RegionSet) -> Self {
        Self {
            name: name.into(),
            file_size,
            window_start: 0,
            window_size: file_size,
            regions,
            specs: default_area_specs(),
            sections: Vec::new(),
        }
    }

    /// Colour map of an analysis, labelled with its code architectures.
    pub fn from_report(report: &'a AnalysisReport) -> Self {
        let name = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| report.path.display().to_string());
        let window_size = report
            .sizes
            .map(|s| s.file_size)
            .unwrap_or_else(|| report.window.len(report.file_size));
        Self::new(name, report.file_size, &report.regions)
            .with_window(report.window.start, window_size)
            .with_code_label(report.code_label.as_deref())
    }

    pub fn with_window(mut self, start: u64, size: u64) -> Self {
        self.window_start = start;
        self.window_size = size;
        self
    }

    /// Overlay the declared executable sections.
    pub fn with_sections(mut self, sections: &SectionMap) -> Self {
        self.sections = sections
            .iter()
            .flat_map(|(name, spans)| {
                spans.iter().map(move |iv| SectionSpan {
                    name: name.clone(),
                    start: iv.start,
                    end: iv.end,
                })
            })
            .collect();
        self
    }

    /// Replace the `Code` legend label, e.g. with `Intel-64, Mips-32-be`.
    pub fn with_code_label(self, label: Option<&str>) -> Self {
        self.with_label(Category::Code, label)
    }

    pub fn with_alien_label(self, label: Option<&str>) -> Self {
        self.with_label(Category::AlienCode, label)
    }

    fn with_label(mut self, category: Category, label: Option<&str>) -> Self {
        if let Some(label) = label {
            if let Some(spec) = self.specs.iter_mut().find(|s| s.id == category) {
                spec.label = label.to_string();
            }
        }
        self
    }

    fn color_of(&self, category: Category) -> String {
        self.specs
            .iter()
            .find(|s| s.id == category)
            .map(|s| s.dot_color.clone())
            .unwrap_or_default()
    }

    fn area(&self, start: u64, end: u64, category: Category) -> Area {
        Area { start, end, category, color: self.color_of(category) }
    }

    /// Lay out the bar. `Ok(None)` when there are no regions to show.
    pub fn build(&self) -> Result<Option<ColorBar>, RenderError> {
        if self.file_size < MIN_FILE_SIZE {
            return Err(RenderError::TooSmall { size: self.file_size, min: MIN_FILE_SIZE });
        }
        if self.regions.is_empty() {
            return Ok(None);
        }

        let areas = self.padded_areas();
        let mut bounds: Vec<u64> = areas.iter().map(|a| a.start).collect();
        if let Some(last) = areas.last() {
            bounds.push(last.end);
        }

        let resolution = tick_resolution(self.window_size);
        let ticks: Vec<u64> = (0..=self.window_size).step_by(resolution as usize).collect();
        let tick_labels =
            ticks.iter().map(|t| format!("0x{:04x}", t + self.window_start)).collect();

        let legend = self
            .specs
            .iter()
            .filter(|s| !self.regions.get(s.id).is_empty())
            .cloned()
            .collect();

        let mut sections: Vec<SectionSpan> = self
            .sections
            .iter()
            .filter(|s| s.start < self.window_size)
            .map(|s| SectionSpan { end: s.end.min(self.window_size), ..s.clone() })
            .collect();
        sections.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)));

        let kib = (self.window_size as f64 / 1024.0).round_ties_even() as u64;
        Ok(Some(ColorBar {
            title: format!("{} ({} kB)", self.name, kib),
            axis_label: "Byte location".to_string(),
            areas,
            bounds,
            resolution,
            ticks,
            tick_labels,
            legend,
            sections,
        }))
    }

    /// All regions sorted by start, with gaps before, between and after them
    /// filled as `Data`.
    fn padded_areas(&self) -> Vec<Area> {
        let mut areas: Vec<Area> = self
            .regions
            .iter()
            .flat_map(|(category, list)| {
                list.iter().map(move |r| (r.start(), r.end(), category))
            })
            .map(|(start, end, category)| self.area(start, end, category))
            .collect();
        areas.sort_by_key(|a| a.start);

        let mut padded = Vec::with_capacity(areas.len() * 2 + 2);
        let mut cursor = 0u64;
        for area in areas {
            if area.start > cursor {
                padded.push(self.area(cursor, area.start, Category::Data));
            }
            cursor = cursor.max(area.end);
            padded.push(area);
        }
        if cursor < self.window_size {
            padded.push(self.area(cursor, self.window_size, Category::Data));
        }
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Architecture, Endianness, Interval, Region};

    fn sample() -> RegionSet {
        RegionSet::new()
            .with(
                Category::Code,
                vec![Region::code(
                    0x400,
                    0x800,
                    Architecture::new("Intel", 64, Endianness::Little),
                )],
            )
            .with(Category::Zero, vec![Region::plain(0x900, 0xA00)])
    }

    #[test]
    fn resolution_keeps_ticks_below_fifty() {
        assert_eq!(tick_resolution(0x80), 0x100);
        assert_eq!(tick_resolution(0x100), 0x100);
        assert_eq!(tick_resolution(38_808), 0x500);
        for size in [0x1000u64, 38_808, 1 << 20, 5 << 20] {
            assert!(size / (tick_resolution(size) - TICK_STEP) <= 50);
        }
    }

    #[test]
    fn gaps_are_padded_with_data() {
        let regions = sample();
        let bar = ColorMap::new("sample.bin", 0xC00, &regions).build().unwrap().unwrap();
        let spans: Vec<(u64, u64, Category)> =
            bar.areas.iter().map(|a| (a.start, a.end, a.category)).collect();
        assert_eq!(
            spans,
            vec![
                (0, 0x400, Category::Data),
                (0x400, 0x800, Category::Code),
                (0x800, 0x900, Category::Data),
                (0x900, 0xA00, Category::Zero),
                (0xA00, 0xC00, Category::Data),
            ]
        );
        assert_eq!(bar.bounds, vec![0, 0x400, 0x800, 0x900, 0xA00, 0xC00]);
        assert_eq!(bar.areas[1].color, "#00bfbf");
    }

    #[test]
    fn legend_lists_present_categories_with_architecture_label() {
        let regions = sample();
        let bar = ColorMap::new("sample.bin", 0xC00, &regions)
            .with_code_label(regions.code_label().as_deref())
            .build()
            .unwrap()
            .unwrap();
        let labels: Vec<&str> = bar.legend.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Intel-64", "Padding/Zero"]);
        assert_eq!(bar.title, "sample.bin (3 kB)");
    }

    #[test]
    fn tick_labels_are_shifted_by_window_start() {
        let regions = RegionSet::new().with(Category::Data, vec![Region::plain(0, 0x300)]);
        let bar = ColorMap::new("f", 0x10000, &regions)
            .with_window(0x800, 0x300)
            .build()
            .unwrap()
            .unwrap();
        // 0x300 / 0x100 = 3 ticks already fits, then the step advances once.
        assert_eq!(bar.resolution, 0x200);
        assert_eq!(bar.ticks, vec![0, 0x200]);
        assert_eq!(bar.tick_labels, vec!["0x0800", "0x0a00"]);
    }

    #[test]
    fn sections_overlay_is_sorted_and_clipped_to_the_window() {
        let regions = sample();
        let mut sections = SectionMap::new();
        sections.insert(".text".into(), vec![Interval::new(0x400, 0x800)]);
        sections.insert(".init".into(), vec![Interval::new(0x100, 0x180)]);
        sections.insert(".fini".into(), vec![Interval::new(0xB00, 0x2000)]);
        sections.insert(".gone".into(), vec![Interval::new(0x3000, 0x3100)]);

        let bar = ColorMap::new("sample.bin", 0xC00, &regions)
            .with_sections(&sections)
            .build()
            .unwrap()
            .unwrap();
        let spans: Vec<(&str, u64, u64)> =
            bar.sections.iter().map(|s| (s.name.as_str(), s.start, s.end)).collect();
        assert_eq!(
            spans,
            vec![(".init", 0x100, 0x180), (".text", 0x400, 0x800), (".fini", 0xB00, 0xC00)]
        );

        let plain = ColorMap::new("sample.bin", 0xC00, &regions).build().unwrap().unwrap();
        assert!(plain.sections.is_empty());
        assert!(serde_json::to_value(&plain).unwrap().get("sections").is_none());
    }

    #[test]
    fn small_files_and_empty_regions() {
        let regions = sample();
        assert_eq!(
            ColorMap::new("tiny", 0xFF, &regions).build().unwrap_err(),
            RenderError::TooSmall { size: 0xFF, min: MIN_FILE_SIZE }
        );
        let empty = RegionSet::new();
        assert_eq!(ColorMap::new("empty", 0x1000, &empty).build().unwrap(), None);
    }
}
