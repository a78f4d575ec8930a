//! # Translation Engine
//!
//! Drives a [`ScanSource`] through the whole raw-to-chromatogram pipeline:
//!
//! 1. **Overview**: one cheap pass for m/z bounds, MS levels, polarities and the
//!    per-file headers.
//! 2. **Partitioning**: the integer m/z range is split into
//!    `iterations x threads` shards, where the iteration count keeps the scans
//!    buffered at once within `max_bytes_per_iteration` of input.
//! 3. **Iterations**: per iteration the source is read once and every scan is
//!    fanned out to that iteration's shard workers, which then write their
//!    partial artifacts on their own threads.
//! 4. **Merging**: partial files are concatenated in m/z order, indexes
//!    reconciled and retention-time records unioned.
//! 5. **Headers**: one `.head` file per artifact set.
//!
//! With one thread and one iteration the separate overview pass is skipped: the
//! source is read once into an unbounded worker whose buffered scans provide
//! the overview, and the worker writes directly into the output directory.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mzchrom::translator::{Translator, TranslatorConfig};
//!
//! let config = TranslatorConfig::default().with_threads(4);
//! let stats = Translator::new(config).translate_file("run.ndjson", "out")?;
//! println!("{stats}");
//! # Ok::<(), mzchrom::translator::TranslationError>(())
//! ```

mod config;
mod error;
mod merge;
mod partition;
mod state;
mod stats;
mod supervisor;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

pub use config::TranslatorConfig;
pub use error::TranslationError;
pub use partition::{iteration_count, ShardPlan};
pub use state::TranslationState;
pub use stats::TranslationStats;
pub use supervisor::WorkerState;

use crate::codec::MzScale;
use crate::header::{ChromHeader, MsnLevel, FORMAT_VERSION};
use crate::scan::Overview;
use crate::shard::{
    ChromParams, MsnScanInfo, SetOutput, ShardId, ShardOutput, ShardSpec, ShardWorker,
    OVERLAP_TOLERANCE,
};
use crate::source::{open_source, ScanDispatcher, ScanSink, ScanSource};
use supervisor::ShardSupervisor;

/// Integer m/z bounds `[lower, upper)` covering the overview.
///
/// A degenerate range (all peaks in one bin) still gets one line.
fn grid_bounds(overview: &Overview, scale: &MzScale) -> (i64, i64) {
    if overview.is_empty() {
        return (0, 0);
    }
    let lower = scale.lower_bound(overview.lowest_mz);
    let upper = scale
        .upper_bound(overview.highest_mz)
        .max(lower + scale.step());
    (lower, upper)
}

/// Precursor map of one level: precursors ascending, scans ascending within.
fn group_precursors(scans: &[MsnScanInfo]) -> Vec<(String, Vec<i32>)> {
    let mut pairs: Vec<(f64, i32)> = scans
        .iter()
        .filter_map(|s| s.precursor_mz.map(|mz| (mz, s.scan)))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut groups: Vec<(String, Vec<i32>)> = Vec::new();
    for (mz, scan) in pairs {
        let key = mz.to_string();
        match groups.last_mut() {
            Some((last, scans)) if *last == key => scans.push(scan),
            _ => groups.push((key, vec![scan])),
        }
    }
    groups
}

/// Turns a scan source into chromatogram artifacts.
pub struct Translator {
    config: TranslatorConfig,
    state: TranslationState,
    abort: Arc<AtomicBool>,
}

impl Translator {
    /// Translator with the given configuration.
    pub fn new(config: TranslatorConfig) -> Self {
        Self {
            config,
            state: TranslationState::Configuring,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Where the last (or current) run is.
    pub fn state(&self) -> TranslationState {
        self.state
    }

    /// Flag that stops the running translation at the next batch boundary
    /// when set. A flag raised before a run starts stops that run; it is
    /// cleared once the run ends.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Open `input` (see [`open_source`]) and translate it into `output_dir`.
    pub fn translate_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        input: P,
        output_dir: Q,
    ) -> Result<TranslationStats, TranslationError> {
        let mut source = open_source(input)?;
        self.translate(source.as_mut(), output_dir.as_ref())
    }

    /// Translate `source` into `output_dir`, creating the directory if needed.
    pub fn translate(
        &mut self,
        source: &mut dyn ScanSource,
        output_dir: &Path,
    ) -> Result<TranslationStats, TranslationError> {
        self.state = TranslationState::Configuring;
        let started = Instant::now();
        info!(
            "Translating '{}' ({} bytes) into {}",
            source.name(),
            source.size_bytes(),
            output_dir.display()
        );

        let result = self.run(source, output_dir);
        self.abort.store(false, Ordering::SeqCst);
        match result {
            Ok(mut stats) => {
                stats.elapsed = started.elapsed();
                self.transition(TranslationState::Done);
                info!("{stats}");
                Ok(stats)
            }
            Err(e) => {
                self.transition(TranslationState::Failed);
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: TranslationState) {
        info!("Translation state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn run(
        &mut self,
        source: &mut dyn ScanSource,
        output_dir: &Path,
    ) -> Result<TranslationStats, TranslationError> {
        self.config.validate()?;
        let scale = MzScale::new(
            self.config.multiplication_factor,
            self.config.lowest_resolution,
        )
        .map_err(|e| TranslationError::InvalidConfig(e.to_string()))?;
        fs::create_dir_all(output_dir)?;

        let iterations = iteration_count(source.size_bytes(), self.config.max_bytes_per_iteration);
        if self.config.threads == 1 && iterations == 1 {
            return self.run_single(source, output_dir, scale);
        }

        let overview = source.overview(self.config.msn)?;
        self.transition(TranslationState::OverviewRead);
        self.log_overview(&overview);

        self.transition(TranslationState::Partitioning);
        let (lower, upper) = grid_bounds(&overview, &scale);
        let plan = ShardPlan::new(
            lower,
            upper,
            &scale,
            iterations,
            self.config.threads,
            OVERLAP_TOLERANCE,
        );
        info!(
            "Partitioned {} lines per level into {} shard(s) over {} iteration(s)",
            plan.total_lines(),
            plan.shard_count(),
            plan.iteration_count()
        );
        let params = Arc::new(self.params(&overview, scale, source.name()));

        let workspace = tempfile::Builder::new()
            .prefix(".mzchrom-shards-")
            .tempdir_in(output_dir)?;
        let mut outputs = Vec::with_capacity(plan.shard_count());
        for iteration in 0..plan.iteration_count() {
            self.transition(TranslationState::Iterating {
                iteration,
                of: plan.iteration_count(),
            });
            let shards = plan.iteration(iteration);
            outputs.extend(self.run_iteration(source, shards, &params, workspace.path())?);
        }

        self.transition(TranslationState::Merging);
        let sets = merge::merge_shards(&outputs, output_dir, params.index_stride)?;
        workspace.close()?;

        let mut stats = self.finish(&sets, &params, &plan, &outputs)?;
        stats.iterations = plan.iteration_count();
        Ok(stats)
    }

    /// One thread, one iteration: a single read serves as overview and data.
    fn run_single(
        &mut self,
        source: &mut dyn ScanSource,
        output_dir: &Path,
        scale: MzScale,
    ) -> Result<TranslationStats, TranslationError> {
        let id = ShardId::new(0, 0);
        let mut worker = ShardWorker::new(ShardSpec::unbounded(id));
        {
            let sinks: Vec<&mut dyn ScanSink> = vec![&mut worker];
            let mut dispatcher = ScanDispatcher::new(sinks, self.config.msn);
            source.read(&mut dispatcher)?;
        }
        let overview = worker.overview(self.config.msn);
        self.transition(TranslationState::OverviewRead);
        self.log_overview(&overview);

        self.transition(TranslationState::Partitioning);
        let (lower, upper) = grid_bounds(&overview, &scale);
        let plan = ShardPlan::new(lower, upper, &scale, 1, 1, OVERLAP_TOLERANCE);
        if let Some(spec) = plan.shards().next() {
            worker.rebind(*spec);
        }
        let params = self.params(&overview, scale, source.name());

        self.transition(TranslationState::Iterating { iteration: 0, of: 1 });
        let output = worker
            .write_to_chrom(&params, output_dir, &self.abort)
            .map_err(|e| TranslationError::shard(id, e))?;

        // Written in place, nothing to join
        self.transition(TranslationState::Merging);
        let outputs = [output];
        let mut stats = self.finish(&outputs[0].sets, &params, &plan, &outputs)?;
        stats.iterations = 1;
        stats.reused_overview = true;
        Ok(stats)
    }

    fn run_iteration(
        &self,
        source: &mut dyn ScanSource,
        shards: &[ShardSpec],
        params: &Arc<ChromParams>,
        workspace: &Path,
    ) -> Result<Vec<ShardOutput>, TranslationError> {
        let mut workers: Vec<ShardWorker> = shards.iter().copied().map(ShardWorker::new).collect();
        let dropped = {
            let sinks: Vec<&mut dyn ScanSink> = workers
                .iter_mut()
                .map(|w| w as &mut dyn ScanSink)
                .collect();
            let mut dispatcher = ScanDispatcher::new(sinks, params.msn);
            source.read(&mut dispatcher)?;
            dispatcher.dropped_msn()
        };
        if dropped > 0 {
            debug!("{dropped} MSn scans had a precursor outside this iteration");
        }

        let mut jobs = Vec::with_capacity(workers.len());
        for worker in workers {
            let dir = workspace.join(format!("shard-{}", worker.spec().id));
            fs::create_dir_all(&dir)?;
            jobs.push((worker, dir));
        }

        if self.config.threads == 1 {
            jobs.into_iter()
                .map(|(worker, dir)| {
                    let shard = worker.spec().id;
                    worker
                        .write_to_chrom(params, &dir, &self.abort)
                        .map_err(|e| TranslationError::shard(shard, e))
                })
                .collect()
        } else {
            ShardSupervisor::new(Arc::clone(&self.abort), self.config.poll_interval)
                .run(jobs, Arc::clone(params))
        }
    }

    fn params(&self, overview: &Overview, scale: MzScale, source_name: &str) -> ChromParams {
        let highest_ms_level = if self.config.msn.is_enabled() {
            overview.highest_ms_level.max(1)
        } else {
            1
        };
        ChromParams {
            scale,
            msn: self.config.msn,
            highest_ms_level,
            polarity_switching: overview.polarity_switching(),
            index_stride: self.config.index_stride,
            batch_bins: self.config.batch_bins,
            default_stem: self
                .config
                .stem
                .clone()
                .unwrap_or_else(|| source_name.to_string()),
        }
    }

    fn log_overview(&self, overview: &Overview) {
        if overview.is_empty() {
            warn!("Source contains no peaks; artifacts will be empty");
        } else {
            info!(
                "Overview: m/z {:.4}-{:.4}, {} logical file(s), {} scans, MS level <= {}{}",
                overview.lowest_mz,
                overview.highest_mz,
                overview.headers.len(),
                overview.scan_count(),
                overview.highest_ms_level,
                if overview.polarity_switching() {
                    ", polarity switching"
                } else {
                    ""
                }
            );
        }
    }

    /// Write one header per set and total up the run.
    fn finish(
        &mut self,
        sets: &[SetOutput],
        params: &ChromParams,
        plan: &ShardPlan,
        outputs: &[ShardOutput],
    ) -> Result<TranslationStats, TranslationError> {
        // Every shard sees every MS1 scan, so the first count is the total
        let unknown = outputs.first().map_or(0, |o| o.unknown_polarity);
        if unknown > 0 {
            warn!("{unknown} MS1 scans with unknown polarity were left out of the polarity split");
        }
        if sets.is_empty() {
            warn!("Source announced no files; no artifacts written");
        }

        let created = Utc::now();
        let mut stats = TranslationStats {
            shards: outputs.len(),
            sets_written: sets.len(),
            lines_per_level: plan.total_lines(),
            highest_ms_level: params.highest_ms_level,
            polarity_switching: params.polarity_switching,
            ..Default::default()
        };
        for set in sets {
            let header = self.build_header(set, params, plan, created);
            let path = set.paths.head();
            header.write(&path)?;
            debug!("Wrote header {}", path.display());

            stats.ms1_scans += header.scan_count;
            stats.msn_scans += header.msn_levels.iter().map(|l| l.scan_count).sum::<usize>();
            stats.bytes_written += set.levels.iter().map(|l| l.stats.bytes).sum::<u64>();
            stats.headers.push(path);
        }
        self.transition(TranslationState::HeaderWritten);
        Ok(stats)
    }

    fn build_header(
        &self,
        set: &SetOutput,
        params: &ChromParams,
        plan: &ShardPlan,
        created: DateTime<Utc>,
    ) -> ChromHeader {
        let summary = &set.summary;
        let msn_levels = (2..=params.highest_ms_level)
            .map(|level| MsnLevel {
                level,
                chrom_file: set.paths.chrom_name(level),
                index_file: set.paths.index_name(level),
                rtt_file: set.paths.rtt_name(level),
                scan_count: summary.msn_count(level),
                precursors: group_precursors(
                    summary.msn.get(&level).map(Vec::as_slice).unwrap_or_default(),
                ),
            })
            .collect();

        ChromHeader {
            version: FORMAT_VERSION,
            created: Some(created),
            source_file: summary.source_file.clone(),
            multiplication_factor: params.scale.factor(),
            lowest_resolution: self.config.lowest_resolution,
            mz_lowest: plan.lower(),
            mz_highest: plan.upper(),
            index_stride: params.index_stride,
            scan_count: summary.ms1_retention_times.len(),
            highest_ms_level: params.highest_ms_level,
            polarity: set.key.polarity,
            polarity_switched: params.polarity_switching,
            msn_mode: params.msn,
            start_rt: summary.start_rt,
            end_rt: summary.end_rt,
            chrom_file: set.paths.chrom_name(1),
            index_file: set.paths.index_name(1),
            retention_times: summary.ms1_retention_times.clone(),
            msn_levels,
        }
    }
}
