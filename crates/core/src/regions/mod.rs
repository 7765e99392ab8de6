//! Region post-processing: interval algebra, adjacency merging and block
//! padding.

pub mod algebra;
pub mod merge;

use thiserror::Error;

pub use algebra::{
    combine, normalize, to_digital, to_mask, try_to_digital, AnalogMask, MaskOp,
};
pub use merge::{merge, pad, BLOCK_SIZE};

use crate::model::RegionSet;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionError {
    #[error("region mask has an odd number of transitions ({count})")]
    UnpairedTransitions { count: usize },
    #[error("intersection needs at least one gate interval")]
    EmptyIntersectionGate,
}

/// Merge adjacent regions, then pad the trailing partial block of a
/// `window_len`-byte scan window.
pub fn sanitize(regions: &RegionSet, window_len: u64) -> RegionSet {
    let mut merged = merge(regions);
    pad(&mut merged, window_len);
    merged
}
