#[cfg(feature = "codescan-backend")]
pub mod codescan;
#[cfg(feature = "replay-backend")]
pub mod replay;

#[cfg(feature = "codescan-backend")]
pub use codescan::CodescanBackend;
#[cfg(feature = "replay-backend")]
pub use replay::ReplayBackend;
