//! # Scan Data Model
//!
//! Spectra as produced by an instrument-file reader and consumed by the
//! translation engine. A [`Scan`] is owned by the shard worker that receives
//! it and is discarded once folded into chromatogram lines.

mod header;
mod types;

pub use header::{Overview, ScanHeader};
pub use types::{MsnMode, PeakArrays, Polarity, Scan};
