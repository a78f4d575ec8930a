//! # Chromatogram Reader
//!
//! Random access to the artifacts a translation wrote. A reader is opened on a
//! `.head` file; data lines are located through the sparse index, so reading
//! one line touches at most one index window of the data file.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mzchrom::reader::ChromatogramReader;
//!
//! let reader = ChromatogramReader::open("out/run.head")?;
//!
//! // Extracted ion chromatogram of 500.25 +/- 0.01 on MS1
//! let xic = reader.extract_chromatogram(1, 500.24, 500.26)?;
//! for (rt, intensity) in xic.retention_times.iter().zip(&xic.intensities) {
//!     println!("{rt}\t{intensity}");
//! }
//! # Ok::<(), mzchrom::reader::ReaderError>(())
//! ```

mod error;
mod lines;
mod open;
mod summary;


use std::path::PathBuf;

pub use error::ReaderError;
pub use lines::Chromatogram;
pub use summary::{ChromSummary, LevelSummary};

use crate::codec::{IndexEntry, MzScale};
use crate::header::ChromHeader;

/// Files of one MS level, with the index held in memory.
#[derive(Debug, Clone)]
struct LevelFiles {
    level: u8,
    data: PathBuf,
    index: Vec<IndexEntry>,
    rtt: Option<PathBuf>,
}

/// Reader for one artifact set
#[derive(Debug)]
pub struct ChromatogramReader {
    header: ChromHeader,
    scale: MzScale,
    dir: PathBuf,
    levels: Vec<LevelFiles>,
}

impl ChromatogramReader {
    /// The parsed header.
    pub fn header(&self) -> &ChromHeader {
        &self.header
    }

    /// Integer m/z grid of the set.
    pub fn scale(&self) -> &MzScale {
        &self.scale
    }

    /// Directory holding the artifacts.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Lines per level.
    pub fn line_count(&self) -> u64 {
        self.scale
            .line_count(self.header.mz_lowest, self.header.mz_highest)
    }

    /// MS levels with artifacts, ascending.
    pub fn levels(&self) -> Vec<u8> {
        self.levels.iter().map(|l| l.level).collect()
    }

    /// Line holding `mz`, if it lies inside the set's range.
    pub fn line_for_mz(&self, mz: f64) -> Option<u64> {
        let value = self.scale.to_int(mz);
        if value < self.header.mz_lowest || value >= self.header.mz_highest {
            return None;
        }
        Some(((value - self.header.mz_lowest) / self.scale.step()) as u64)
    }

    /// Lowest m/z of a line's bin.
    pub fn mz_for_line(&self, line: u64) -> f64 {
        self.scale
            .to_mz(self.header.mz_lowest + line as i64 * self.scale.step())
    }

    fn level(&self, level: u8) -> Result<&LevelFiles, ReaderError> {
        self.levels
            .iter()
            .find(|l| l.level == level)
            .ok_or(ReaderError::MissingLevel(level))
    }
}
