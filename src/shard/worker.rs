use std::path::Path;
use std::sync::atomic::AtomicBool;

use log::debug;

use super::error::ShardError;
use super::fill::{write_tracks, Track};
use super::output::{
    assign_stems, set_stem, LevelOutput, MsnScanInfo, SetKey, SetOutput, SetSummary, ShardOutput,
};
use super::{ChromParams, ShardSpec};
use crate::codec::{
    normalize_retention_times, write_retention_time_file, ArtifactPaths, ChromFileWriter,
    RetentionTimeEntry,
};
use crate::scan::{MsnMode, Overview, Polarity, Scan, ScanHeader};
use crate::source::{overview_range, ScanSink, SinkError};

/// Scans of one logical source file. MSn scans live under their base scan.
#[derive(Debug)]
struct FileBuffer {
    header: ScanHeader,
    received: usize,
    scans: Vec<Scan>,
}

impl FileBuffer {
    fn new(header: ScanHeader) -> Self {
        let scans = Vec::with_capacity(header.scan_count.min(4096));
        Self {
            header,
            received: 0,
            scans,
        }
    }
}

/// Whether a scan of polarity `scan` belongs to a set of polarity `set`.
fn belongs(set: Polarity, scan: Polarity) -> bool {
    set == Polarity::Unknown || set == scan
}

/// Fragment polarity, inherited from the base scan when unreported.
fn effective_polarity(fragment: &Scan, base: &Scan) -> Polarity {
    if fragment.polarity == Polarity::Unknown {
        base.polarity
    } else {
        fragment.polarity
    }
}

/// Buffers the scans routed to one shard and writes its partial artifacts.
///
/// A worker is plain data: the translator moves it into a thread (or runs it
/// inline), feeds it through the [`ScanSink`] contract, then calls
/// [`ShardWorker::write_to_chrom`].
#[derive(Debug)]
pub struct ShardWorker {
    spec: ShardSpec,
    files: Vec<FileBuffer>,
}

impl ShardWorker {
    /// Worker for one shard.
    pub fn new(spec: ShardSpec) -> Self {
        Self {
            spec,
            files: Vec::new(),
        }
    }

    /// The shard this worker covers.
    pub fn spec(&self) -> &ShardSpec {
        &self.spec
    }

    /// Replace the write range, keeping buffered scans.
    ///
    /// Used when a single worker buffered the whole input with open thresholds
    /// and the bounds are only known afterwards.
    pub fn rebind(&mut self, spec: ShardSpec) {
        self.spec = spec;
    }

    /// Scans buffered so far (all levels).
    pub fn buffered_scans(&self) -> usize {
        self.files.iter().map(|f| f.received).sum()
    }

    /// Overview of the buffered scans, equal to what the source's overview pass
    /// reports when the worker received the complete stream.
    pub fn overview(&self, msn: MsnMode) -> Overview {
        let mut overview = Overview::default();
        for file in &self.files {
            let mut header = file.header.clone();
            for base in &file.scans {
                header.observe(base);
                overview.observe(1, base.polarity, overview_range(base, msn));
                for fragment in &base.children {
                    header.observe(fragment);
                    overview.observe(fragment.ms_level, fragment.polarity, overview_range(fragment, msn));
                }
            }
            overview.headers.push(header);
        }
        overview
    }

    /// Write all sets and levels into `dir`.
    pub fn write_to_chrom(
        self,
        params: &ChromParams,
        dir: &Path,
        abort: &AtomicBool,
    ) -> Result<ShardOutput, ShardError> {
        let names: Vec<Option<String>> = self.files.iter().map(|f| f.header.file_name.clone()).collect();
        let stems = assign_stems(&names, &params.default_stem);
        let polarities: &[Polarity] = if params.polarity_switching {
            &[Polarity::Positive, Polarity::Negative]
        } else {
            &[Polarity::Unknown]
        };

        let mut sets = Vec::with_capacity(self.files.len() * polarities.len());
        let mut unknown_polarity = 0;
        for (file_index, (file, stem)) in self.files.iter().zip(&stems).enumerate() {
            if params.polarity_switching {
                unknown_polarity += file
                    .scans
                    .iter()
                    .filter(|s| s.polarity == Polarity::Unknown)
                    .count();
            }
            for &polarity in polarities {
                let key = SetKey {
                    file: file_index,
                    polarity,
                };
                let paths = ArtifactPaths::new(dir, set_stem(stem, polarity));
                sets.push(self.write_set(file, key, paths, params, abort)?);
            }
        }

        debug!(
            "Shard {} wrote {} set(s) for integer m/z [{}, {})",
            self.spec.id,
            sets.len(),
            self.spec.lower,
            self.spec.upper
        );
        Ok(ShardOutput {
            shard: self.spec.id,
            dir: dir.to_path_buf(),
            sets,
            unknown_polarity,
        })
    }

    fn write_set(
        &self,
        file: &FileBuffer,
        key: SetKey,
        paths: ArtifactPaths,
        params: &ChromParams,
        abort: &AtomicBool,
    ) -> Result<SetOutput, ShardError> {
        let bases: Vec<&Scan> = file
            .scans
            .iter()
            .filter(|s| belongs(key.polarity, s.polarity))
            .collect();

        let mut summary = SetSummary {
            source_file: file.header.file_name.clone(),
            ms1_retention_times: bases.iter().map(|s| s.retention_time).collect(),
            ..Default::default()
        };
        if !bases.is_empty() {
            let times = bases.iter().map(|s| s.retention_time);
            summary.start_rt = times.clone().fold(f32::INFINITY, f32::min);
            summary.end_rt = times.fold(f32::NEG_INFINITY, f32::max);
        }

        let mut tracks: Vec<Track<'_>> = bases
            .iter()
            .enumerate()
            .map(|(ordinal, s)| Track::new(ordinal as i32, &s.peaks.mz, &s.peaks.intensity))
            .collect();
        let mut levels = vec![self.write_level(&paths, 1, &mut tracks, params, abort)?];

        if params.msn.is_enabled() {
            for level in 2..=params.highest_ms_level {
                let (output, scans) = self.write_fragments(file, key, &paths, level, params, abort)?;
                levels.push(output);
                summary.msn.insert(level, scans);
            }
        }

        Ok(SetOutput {
            key,
            paths,
            levels,
            summary,
        })
    }

    fn write_fragments(
        &self,
        file: &FileBuffer,
        key: SetKey,
        paths: &ArtifactPaths,
        level: u8,
        params: &ChromParams,
        abort: &AtomicBool,
    ) -> Result<(LevelOutput, Vec<MsnScanInfo>), ShardError> {
        let scale = &params.scale;
        let (lower, upper) = (self.spec.lower, self.spec.upper);

        let mut fragments: Vec<&Scan> = file
            .scans
            .iter()
            .flat_map(|base| {
                base.children.iter().filter(move |f| {
                    f.ms_level == level && belongs(key.polarity, effective_polarity(f, base))
                })
            })
            .filter(|f| match params.msn {
                MsnMode::Precursor => f
                    .precursor_mz
                    .map(|p| (lower..upper).contains(&scale.to_int(p)))
                    .unwrap_or(false),
                _ => true,
            })
            .collect();
        fragments.sort_by(|a, b| {
            let pa = a.precursor_mz.unwrap_or(0.0);
            let pb = b.precursor_mz.unwrap_or(0.0);
            pa.total_cmp(&pb).then(a.num.cmp(&b.num))
        });

        let mut tracks: Vec<Track<'_>> = fragments
            .iter()
            .map(|f| match (params.msn, f.precursor_mz.as_ref()) {
                (MsnMode::Precursor, Some(precursor)) => Track::new(
                    f.num,
                    std::slice::from_ref(precursor),
                    std::slice::from_ref(&f.total_ion_current),
                ),
                _ => Track::new(f.num, &f.peaks.mz, &f.peaks.intensity),
            })
            .collect();
        let output = self.write_level(paths, level, &mut tracks, params, abort)?;

        let mut retention_times: Vec<RetentionTimeEntry> = fragments
            .iter()
            .map(|f| RetentionTimeEntry::new(f.num, f.retention_time))
            .collect();
        normalize_retention_times(&mut retention_times);
        write_retention_time_file(paths.rtt(level), &retention_times)?;

        let mut infos: Vec<MsnScanInfo> = fragments
            .iter()
            .map(|f| MsnScanInfo {
                scan: f.num,
                retention_time: f.retention_time,
                precursor_mz: f.precursor_mz,
            })
            .collect();
        infos.sort_by_key(|s| s.scan);
        infos.dedup_by_key(|s| s.scan);
        Ok((output, infos))
    }

    fn write_level(
        &self,
        paths: &ArtifactPaths,
        level: u8,
        tracks: &mut [Track<'_>],
        params: &ChromParams,
        abort: &AtomicBool,
    ) -> Result<LevelOutput, ShardError> {
        let mut writer =
            ChromFileWriter::create(paths.chrom(level), paths.index(level), params.index_stride)?;
        write_tracks(
            &mut writer,
            tracks,
            &params.scale,
            self.spec.lower,
            self.spec.upper,
            params.batch_bins,
            abort,
        )?;
        let (stats, _, _) = writer.finish()?;
        Ok(LevelOutput { level, stats })
    }

    fn current_file(&mut self) -> Result<&mut FileBuffer, SinkError> {
        self.files.last_mut().ok_or(SinkError::NoHeader)
    }
}

impl ScanSink for ShardWorker {
    fn add_header(&mut self, header: ScanHeader) -> Result<(), SinkError> {
        self.files.push(FileBuffer::new(header));
        Ok(())
    }

    fn add_scan(&mut self, mut scan: Scan) -> Result<(), SinkError> {
        let index = self.files.len();
        let file = self.current_file()?;
        if file.received >= file.header.scan_count {
            return Err(SinkError::BufferOverflow {
                file: file
                    .header
                    .file_name
                    .clone()
                    .unwrap_or_else(|| format!("#{}", index - 1)),
                capacity: file.header.scan_count,
            });
        }
        file.received += 1;
        scan.peaks.sort_by_mz();

        if scan.ms_level <= 1 {
            file.scans.push(scan);
            return Ok(());
        }
        match file.scans.last_mut() {
            Some(base) => {
                base.children.push(scan);
                Ok(())
            }
            None => Err(SinkError::NoBaseScan {
                scan: scan.num,
                ms_level: scan.ms_level,
            }),
        }
    }

    fn last_base_scan(&self) -> Option<&Scan> {
        self.files.last().and_then(|f| f.scans.last())
    }

    fn add_parent_file_name(&mut self, name: &str) -> Result<(), SinkError> {
        self.current_file()?.header.file_name = Some(name.to_string());
        Ok(())
    }

    fn lower_threshold(&self) -> f64 {
        self.spec.lower_threshold
    }

    fn upper_threshold(&self) -> f64 {
        self.spec.upper_threshold
    }
}
