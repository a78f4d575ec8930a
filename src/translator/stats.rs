use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Summary of a finished translation.
#[derive(Debug, Clone, Default)]
pub struct TranslationStats {
    /// Memory iterations run (source reads after the overview)
    pub iterations: usize,
    /// Shards written
    pub shards: usize,
    /// Artifact sets written (logical files x polarities)
    pub sets_written: usize,
    /// Data lines per level
    pub lines_per_level: u64,
    /// MS1 scans across all sets
    pub ms1_scans: usize,
    /// MSn scans across all sets and levels
    pub msn_scans: usize,
    /// Highest MS level with artifacts
    pub highest_ms_level: u8,
    /// Whether sets were split by polarity
    pub polarity_switching: bool,
    /// Whether the overview came from the buffered scans instead of a separate pass
    pub reused_overview: bool,
    /// Bytes written to data files
    pub bytes_written: u64,
    /// Header files written
    pub headers: Vec<PathBuf>,
    /// Wall-clock time
    pub elapsed: Duration,
}

impl fmt::Display for TranslationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Translated {} set(s): {} MS1 scans, {} MSn scans, {} lines per level, \
             {} bytes in {} shard(s) over {} iteration(s) ({:.2?})",
            self.sets_written,
            self.ms1_scans,
            self.msn_scans,
            self.lines_per_level,
            self.bytes_written,
            self.shards,
            self.iterations,
            self.elapsed
        )
    }
}
