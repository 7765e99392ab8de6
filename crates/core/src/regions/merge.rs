use tracing::debug;

use crate::model::{Category, Interval, Region, RegionSet};

/// Block granularity of the scanner; bytes of a trailing partial block are
/// never classified.
pub const BLOCK_SIZE: u64 = 512;

/// Collapse runs of exactly adjacent regions (`prev.end == cur.start`) per
/// category.
///
/// Lists are sorted by start first. A merged code run keeps the architecture
/// of its rightmost member; every other category collapses to plain regions.
/// Overlapping regions are left alone.
pub fn merge(regions: &RegionSet) -> RegionSet {
    let mut out = RegionSet::new();
    for (category, list) in regions.iter() {
        let merged = merge_category(category, list);
        if merged.len() != list.len() {
            debug!(%category, before = list.len(), after = merged.len(), "merged adjacent regions");
        }
        out.insert(category, merged);
    }
    out
}

fn merge_category(category: Category, list: &[Region]) -> Vec<Region> {
    let mut sorted = list.to_vec();
    if sorted.len() < 2 {
        return sorted;
    }
    sorted.sort_by_key(Region::start);

    // Walk backwards so each collapsed run is written once at its left end.
    let mut runs: Vec<Region> = Vec::with_capacity(sorted.len());
    let mut i = sorted.len();
    while i > 0 {
        let last = i - 1;
        let mut first = last;
        while first > 0 && sorted[first - 1].end() == sorted[first].start() {
            first -= 1;
        }

        if first == last {
            runs.push(sorted[last].clone());
        } else {
            let architecture = if category == Category::Code {
                sorted[last].architecture.clone()
            } else {
                None
            };
            runs.push(Region {
                interval: Interval::new(sorted[first].start(), sorted[last].end()),
                architecture,
            });
        }
        i = first;
    }
    runs.reverse();
    runs
}

/// Append the trailing partial block of a `window_len`-byte window as `Data`.
///
/// Does nothing for an empty set or a window that is a multiple of
/// [`BLOCK_SIZE`]. The appended region is not re-merged.
pub fn pad(regions: &mut RegionSet, window_len: u64) {
    if regions.is_empty() {
        return;
    }
    let remainder = window_len % BLOCK_SIZE;
    if remainder == 0 {
        return;
    }
    let tail = Region::plain(window_len - remainder, window_len);
    debug!(start = tail.start(), end = tail.end(), "padding trailing partial block");
    regions.push(Category::Data, tail);
}
