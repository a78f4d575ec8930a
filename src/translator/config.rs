use std::time::Duration;

use super::error::TranslationError;
use crate::codec::ENTRIES_PER_INDEX;
use crate::scan::MsnMode;

const MIB: u64 = 1024 * 1024;

fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Configuration for a translation run
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorConfig {
    /// Shard workers per iteration
    pub threads: usize,

    /// Input bytes handled per memory iteration; the input is re-read once per
    /// iteration, each time buffering only that iteration's m/z slice
    pub max_bytes_per_iteration: u64,

    /// `round(mz * multiplication_factor)` gives integer m/z
    pub multiplication_factor: i32,

    /// m/z width of one data line
    pub lowest_resolution: f32,

    /// How fragmentation scans are written
    pub msn: MsnMode,

    /// Lines per index window
    pub index_stride: u32,

    /// Bins per batch-fill block (memory per worker grows with
    /// `batch_bins * scans`)
    pub batch_bins: usize,

    /// Supervisor heartbeat
    pub poll_interval: Duration,

    /// Artifact stem for unnamed logical files (defaults to the source name)
    pub stem: Option<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            threads: available_threads(),
            max_bytes_per_iteration: 1024 * MIB,
            multiplication_factor: 10_000,
            lowest_resolution: 0.001,
            msn: MsnMode::Full,
            index_stride: ENTRIES_PER_INDEX,
            batch_bins: 128,
            poll_interval: Duration::from_millis(100),
            stem: None,
        }
    }
}

impl TranslatorConfig {
    /// Configuration for memory-constrained machines: small iterations, two
    /// workers, narrow batch blocks.
    pub fn low_memory() -> Self {
        Self {
            threads: 2,
            max_bytes_per_iteration: 256 * MIB,
            batch_bins: 32,
            ..Self::default()
        }
    }

    /// Configuration favouring throughput: one iteration for inputs up to
    /// 4 GiB, every core, wide batch blocks.
    pub fn fast() -> Self {
        Self {
            threads: available_threads(),
            max_bytes_per_iteration: 4096 * MIB,
            batch_bins: 512,
            ..Self::default()
        }
    }

    /// Balanced configuration (default)
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Set the worker count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the iteration size in bytes
    pub fn with_max_bytes_per_iteration(mut self, bytes: u64) -> Self {
        self.max_bytes_per_iteration = bytes;
        self
    }

    /// Set the iteration size in MiB
    pub fn with_max_mb_per_iteration(self, mb: u64) -> Self {
        self.with_max_bytes_per_iteration(mb.saturating_mul(MIB))
    }

    /// Set the integer m/z grid
    pub fn with_resolution(mut self, multiplication_factor: i32, lowest_resolution: f32) -> Self {
        self.multiplication_factor = multiplication_factor;
        self.lowest_resolution = lowest_resolution;
        self
    }

    /// Set MSn handling
    pub fn with_msn(mut self, msn: MsnMode) -> Self {
        self.msn = msn;
        self
    }

    /// Set the index stride
    pub fn with_index_stride(mut self, stride: u32) -> Self {
        self.index_stride = stride;
        self
    }

    /// Set the batch-fill block size
    pub fn with_batch_bins(mut self, bins: usize) -> Self {
        self.batch_bins = bins;
        self
    }

    /// Set the artifact stem
    pub fn with_stem(mut self, stem: impl Into<String>) -> Self {
        self.stem = Some(stem.into());
        self
    }

    /// Reject settings the translator cannot run with.
    pub fn validate(&self) -> Result<(), TranslationError> {
        let fail = |msg: String| Err(TranslationError::InvalidConfig(msg));
        if self.threads == 0 {
            return fail("threads must be at least 1".into());
        }
        if self.max_bytes_per_iteration == 0 {
            return fail("max bytes per iteration must be positive".into());
        }
        if self.multiplication_factor <= 0 {
            return fail(format!(
                "multiplication factor must be positive, got {}",
                self.multiplication_factor
            ));
        }
        if !(self.lowest_resolution > 0.0) {
            return fail(format!(
                "resolution must be positive, got {}",
                self.lowest_resolution
            ));
        }
        if self.index_stride == 0 {
            return fail("index stride must be at least 1".into());
        }
        if self.batch_bins == 0 {
            return fail("batch size must be at least 1".into());
        }
        if let Some(stem) = &self.stem {
            if stem.is_empty() || stem.contains(['/', '\\']) {
                return fail(format!("invalid artifact stem '{stem}'"));
            }
        }
        Ok(())
    }
}
