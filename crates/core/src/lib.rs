//! codescan-core
//!
//! Core library for post-processing the output of the native code scanner.
//!
//! The scanner itself is an external collaborator: it classifies a binary into
//! typed byte ranges (code, ASCII, high-entropy, zero padding, generic data).
//! This crate owns everything that happens afterwards:
//! - the region model (`model`)
//! - region algebra, merging and padding (`regions`)
//! - size aggregation, the packing decision engine and alien-code
//!   reconciliation (`analysis`)
//! - collaborator adapters for the scanner and the header parser (`services`)
//! - plain rendering data for colour-map plots (`render`)
//! - the workspace layout, configuration and results database (`db`)
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends.

pub mod analysis;
pub mod db;
pub mod logging;
pub mod model;
pub mod regions;
pub mod render;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
