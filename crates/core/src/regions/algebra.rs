//! Boolean set operations over byte intervals.
//!
//! Intervals ("digital" form) are expanded into a dense 0/1 mask ("analog"
//! form) of the scan-window length, combined byte by byte, and converted back
//! into a sorted, minimal interval list. Memory is O(window length); callers
//! bound the window.

use tracing::warn;

use crate::model::Interval;
use crate::regions::RegionError;

/// Operator applied by [`combine`] when folding intervals into a prior mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskOp {
    /// `+`: set every byte covered by the intervals.
    Union,
    /// `-`: clear every byte covered by the intervals.
    Difference,
    /// `*`: keep the prior mask only inside the union of the intervals.
    Intersection,
}

/// Dense per-byte coverage mask, index = byte offset within the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogMask {
    bytes: Vec<u8>,
}

impl AnalogMask {
    /// All-zero mask of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self { bytes: vec![0; len] }
    }

    /// Wrap raw mask values. Anything other than 0/1 is malformed and will be
    /// rejected by [`try_to_digital`] when it unbalances the transitions.
    pub fn from_raw(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of covered bytes.
    pub fn count_ones(&self) -> u64 {
        self.bytes.iter().filter(|b| **b != 0).count() as u64
    }

    fn fill(&mut self, start: u64, end: u64, value: u8) {
        if let Some((s, e)) = self.clamp(start, end) {
            self.bytes[s..e].fill(value);
        }
    }

    fn clamp(&self, start: u64, end: u64) -> Option<(usize, usize)> {
        let len = self.bytes.len() as u64;
        let s = start.min(len);
        let e = end.min(len);
        (s < e).then_some((s as usize, e as usize))
    }
}

/// Expand `intervals` into a fresh mask of `len` bytes.
///
/// Intervals reaching past `len` are clamped; an empty list yields an all-zero
/// mask.
pub fn to_mask(intervals: &[Interval], len: usize) -> AnalogMask {
    let mut mask = AnalogMask::zeroed(len);
    for iv in intervals {
        mask.fill(iv.start, iv.end, 1);
    }
    mask
}

/// Fold `intervals` into `prior` (or a zeroed mask of `len` bytes) with `op`.
///
/// For [`MaskOp::Intersection`] the intervals are sorted by start first and
/// must not be empty: bytes before the first interval, between intervals and
/// after the furthest end are cleared, everything inside keeps its prior value.
pub fn combine(
    intervals: &[Interval],
    len: usize,
    op: MaskOp,
    prior: Option<AnalogMask>,
) -> Result<AnalogMask, RegionError> {
    let mut mask = prior.unwrap_or_else(|| AnalogMask::zeroed(len));

    match op {
        MaskOp::Union => {
            for iv in intervals {
                mask.fill(iv.start, iv.end, 1);
            }
        }
        MaskOp::Difference => {
            for iv in intervals {
                mask.fill(iv.start, iv.end, 0);
            }
        }
        MaskOp::Intersection => {
            if intervals.is_empty() {
                return Err(RegionError::EmptyIntersectionGate);
            }
            let mut sorted = intervals.to_vec();
            sorted.sort_by_key(|iv| iv.start);

            // Clear everything outside the running union of the gate spans.
            let mut covered_until = 0u64;
            for iv in &sorted {
                if iv.start > covered_until {
                    mask.fill(covered_until, iv.start, 0);
                }
                covered_until = covered_until.max(iv.end);
            }
            let mask_len = mask.len() as u64;
            mask.fill(covered_until, mask_len, 0);
        }
    }

    Ok(mask)
}

/// Convert a mask back into sorted `[start, end)` intervals.
///
/// Works on the first difference of the zero-padded mask: every nonzero step
/// is a boundary, and boundaries must pair up. An odd boundary count means the
/// mask was malformed.
pub fn try_to_digital(mask: &AnalogMask) -> Result<Vec<Interval>, RegionError> {
    let values = mask.as_slice();
    let mut boundaries: Vec<u64> = Vec::new();
    let mut previous: i16 = 0;
    let padded = values.iter().map(|v| i16::from(*v)).chain(std::iter::once(0));
    for (offset, value) in padded.enumerate() {
        if value - previous != 0 {
            boundaries.push(offset as u64);
        }
        previous = value;
    }

    if boundaries.len() % 2 != 0 {
        return Err(RegionError::UnpairedTransitions { count: boundaries.len() });
    }

    Ok(boundaries.chunks_exact(2).map(|pair| Interval::new(pair[0], pair[1])).collect())
}

/// Like [`try_to_digital`] but reports malformed masks through the log and
/// returns an empty list, since an empty intersection upstream is not an error.
pub fn to_digital(mask: &AnalogMask) -> Vec<Interval> {
    match try_to_digital(mask) {
        Ok(intervals) => intervals,
        Err(e) => {
            warn!(error = %e, mask_len = mask.len(), "discarding malformed region mask");
            Vec::new()
        }
    }
}

/// Sorted, merged equivalent of `intervals` (overlapping and touching ranges
/// collapse). Equivalent to `to_digital(to_mask(..))` without the mask.
pub fn normalize(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.iter().copied().filter(|iv| !iv.is_empty()).collect();
    sorted.sort();
    let mut out: Vec<Interval> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        match out.last_mut() {
            Some(last) if iv.start <= last.end => last.end = last.end.max(iv.end),
            _ => out.push(iv),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ivs(pairs: &[(u64, u64)]) -> Vec<Interval> {
        pairs.iter().map(|(s, e)| Interval::new(*s, *e)).collect()
    }

    #[test]
    fn empty_interval_list_gives_zero_mask() {
        let mask = to_mask(&[], 16);
        assert_eq!(mask.len(), 16);
        assert_eq!(mask.count_ones(), 0);
        assert!(to_digital(&mask).is_empty());
    }

    #[test]
    fn round_trip_merges_overlaps_and_touching_ranges() {
        let input = ivs(&[(8, 10), (1, 3), (2, 5), (5, 6), (12, 13)]);
        let mask = to_mask(&input, 15);
        assert_eq!(to_digital(&mask), ivs(&[(1, 6), (8, 10), (12, 13)]));
        assert_eq!(to_digital(&mask), normalize(&input));
    }

    #[test]
    fn round_trip_handles_range_ending_at_mask_end() {
        let input = ivs(&[(0, 4), (10, 15)]);
        assert_eq!(to_digital(&to_mask(&input, 15)), input);
    }

    #[test]
    fn difference_removes_covered_bytes() {
        let base = to_mask(&ivs(&[(1, 3), (5, 6), (8, 10)]), 15);
        let result = combine(&ivs(&[(1, 3), (4, 5)]), 15, MaskOp::Difference, Some(base)).unwrap();
        assert_eq!(to_digital(&result), ivs(&[(5, 6), (8, 10)]));
    }

    #[test]
    fn union_adds_coverage() {
        let base = to_mask(&ivs(&[(0, 2)]), 10);
        let result = combine(&ivs(&[(2, 4), (7, 8)]), 10, MaskOp::Union, Some(base)).unwrap();
        assert_eq!(to_digital(&result), ivs(&[(0, 4), (7, 8)]));
    }

    #[test]
    fn intersection_gates_prior_mask() {
        let base = to_mask(&ivs(&[(0, 3), (5, 6), (8, 15)]), 15);
        let result =
            combine(&ivs(&[(4, 6), (1, 3)]), 15, MaskOp::Intersection, Some(base)).unwrap();
        assert_eq!(to_digital(&result), ivs(&[(1, 3), (5, 6)]));
    }

    #[test]
    fn intersection_keeps_bytes_under_nested_gate() {
        // (2, 12) outlasts (4, 6); bytes 6..12 must survive.
        let base = to_mask(&ivs(&[(0, 15)]), 15);
        let result =
            combine(&ivs(&[(2, 12), (4, 6)]), 15, MaskOp::Intersection, Some(base)).unwrap();
        assert_eq!(to_digital(&result), ivs(&[(2, 12)]));
    }

    #[test]
    fn intersection_rejects_empty_gate() {
        let base = to_mask(&ivs(&[(0, 3)]), 5);
        let err = combine(&[], 5, MaskOp::Intersection, Some(base)).unwrap_err();
        assert!(matches!(err, RegionError::EmptyIntersectionGate));
    }

    #[test]
    fn intervals_past_the_end_are_clamped() {
        let mask = to_mask(&ivs(&[(3, 100), (200, 300)]), 8);
        assert_eq!(to_digital(&mask), ivs(&[(3, 8)]));
    }

    #[test]
    fn unbalanced_mask_is_reported_and_dropped() {
        // 0 -> 1 -> 2 -> 0 yields three boundaries.
        let mask = AnalogMask::from_raw(vec![0, 1, 2, 0]);
        let err = try_to_digital(&mask).unwrap_err();
        assert!(matches!(err, RegionError::UnpairedTransitions { count: 3 }));
        assert!(to_digital(&mask).is_empty());
    }
}
