//! # Shard Workers
//!
//! A shard is one `(iteration, thread)` cell of the partition: a half-open,
//! step-aligned integer m/z range `[lower, upper)` whose worker receives scans
//! through slightly wider float thresholds (the overlap tolerance) so that peaks
//! rounding onto a boundary bin are never lost.
//!
//! A [`ShardWorker`] buffers its scans per logical source file, then writes one
//! data/index pair per MS level (plus a retention-time file for levels >= 2) for
//! every artifact set into its own directory.

mod error;
mod fill;
mod output;
mod worker;

#[cfg(test)]
mod tests;

use std::fmt;

use crate::codec::MzScale;
use crate::scan::MsnMode;

pub use error::ShardError;
pub use output::{
    assign_stems, set_stem, LevelOutput, MsnScanInfo, SetKey, SetOutput, SetSummary, ShardOutput,
};
pub use worker::ShardWorker;

/// Routing slack on either side of a shard's range, in m/z units.
pub const OVERLAP_TOLERANCE: f64 = 1.0;

/// Position of a shard in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardId {
    /// Memory iteration
    pub iteration: usize,
    /// Thread slot within the iteration
    pub index: usize,
}

impl ShardId {
    /// Create a new id.
    pub fn new(iteration: usize, index: usize) -> Self {
        Self { iteration, index }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.iteration, self.index)
    }
}

/// The m/z range one worker is responsible for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShardSpec {
    /// Position in the plan
    pub id: ShardId,
    /// First integer m/z written (inclusive, step aligned)
    pub lower: i64,
    /// Integer m/z bound (exclusive, step aligned)
    pub upper: i64,
    /// Lowest m/z routed to the worker
    pub lower_threshold: f64,
    /// Highest m/z routed to the worker (exclusive)
    pub upper_threshold: f64,
}

impl ShardSpec {
    /// Shard writing `[lower, upper)` and receiving peaks within `tolerance` of it.
    pub fn new(id: ShardId, lower: i64, upper: i64, scale: &MzScale, tolerance: f64) -> Self {
        Self {
            id,
            lower,
            upper,
            lower_threshold: scale.to_mz(lower) - tolerance,
            upper_threshold: scale.to_mz(upper) + tolerance,
        }
    }

    /// Shard that accepts every scan; its range is bound later with
    /// [`ShardWorker::rebind`].
    pub fn unbounded(id: ShardId) -> Self {
        Self {
            id,
            lower: 0,
            upper: 0,
            lower_threshold: f64::NEG_INFINITY,
            upper_threshold: f64::INFINITY,
        }
    }

    /// Number of data lines the shard writes per level.
    pub fn line_count(&self, scale: &MzScale) -> u64 {
        scale.line_count(self.lower, self.upper)
    }
}

/// Run-wide parameters every worker writes with.
#[derive(Debug, Clone)]
pub struct ChromParams {
    /// Integer m/z grid
    pub scale: MzScale,
    /// How fragmentation scans are written
    pub msn: MsnMode,
    /// Highest MS level present; levels `2..=highest` always get artifacts
    pub highest_ms_level: u8,
    /// Whether artifact sets are split by polarity
    pub polarity_switching: bool,
    /// Lines per index window
    pub index_stride: u32,
    /// Bins per batch-fill block
    pub batch_bins: usize,
    /// Stem for logical files the source does not name
    pub default_stem: String,
}
