//! What a finished shard hands back to the translator.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::codec::{ArtifactPaths, ChromFileStats};
use crate::scan::Polarity;

use super::ShardId;

/// One MSn scan as recorded in the header and retention-time file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsnScanInfo {
    /// Source scan number
    pub scan: i32,
    /// Retention time in seconds
    pub retention_time: f32,
    /// Precursor m/z, if the source reported one
    pub precursor_mz: Option<f64>,
}

/// Identifies one artifact set: a logical source file and (when the run
/// switches polarity) one polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetKey {
    /// Position of the logical file in the source stream
    pub file: usize,
    /// Polarity of the set, [`Polarity::Unknown`] when the run does not switch
    pub polarity: Polarity,
}

/// Everything besides line data that the header of a set needs.
///
/// Every shard sees all MS1 scans, so MS1 fields are identical across shards.
/// MSn scans may be split across shards (precursor mode), so per-level lists
/// are unioned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetSummary {
    /// Logical source file name, if known
    pub source_file: Option<String>,
    /// Retention time of every MS1 scan, indexed by MS1 ordinal
    pub ms1_retention_times: Vec<f32>,
    /// Earliest retention time of the set
    pub start_rt: f32,
    /// Latest retention time of the set
    pub end_rt: f32,
    /// MSn scans per level, sorted by scan number
    pub msn: BTreeMap<u8, Vec<MsnScanInfo>>,
}

impl SetSummary {
    /// Union another shard's summary of the same set into this one.
    pub fn absorb(&mut self, other: SetSummary) {
        if self.source_file.is_none() {
            self.source_file = other.source_file;
        }
        if self.ms1_retention_times.is_empty() {
            self.ms1_retention_times = other.ms1_retention_times;
            self.start_rt = other.start_rt;
            self.end_rt = other.end_rt;
        } else if !other.ms1_retention_times.is_empty() {
            self.start_rt = self.start_rt.min(other.start_rt);
            self.end_rt = self.end_rt.max(other.end_rt);
        }
        for (level, scans) in other.msn {
            let merged = self.msn.entry(level).or_default();
            merged.extend(scans);
            merged.sort_by_key(|s| s.scan);
            merged.dedup_by_key(|s| s.scan);
        }
    }

    /// Number of MSn scans recorded for `level`.
    pub fn msn_count(&self, level: u8) -> usize {
        self.msn.get(&level).map_or(0, Vec::len)
    }
}

/// Partial artifacts of one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelOutput {
    /// MS level
    pub level: u8,
    /// Lines and bytes written
    pub stats: ChromFileStats,
}

/// Partial artifacts of one set inside a shard directory.
#[derive(Debug, Clone)]
pub struct SetOutput {
    /// Which set this is
    pub key: SetKey,
    /// Artifact locations (inside the shard directory)
    pub paths: ArtifactPaths,
    /// One entry per written level, ascending
    pub levels: Vec<LevelOutput>,
    /// Header material
    pub summary: SetSummary,
}

impl SetOutput {
    /// Output of `level`, if written.
    pub fn level(&self, level: u8) -> Option<&LevelOutput> {
        self.levels.iter().find(|l| l.level == level)
    }
}

/// Result of a successful shard.
#[derive(Debug, Clone)]
pub struct ShardOutput {
    /// Which shard produced this
    pub shard: ShardId,
    /// Directory holding the partial artifacts
    pub dir: PathBuf,
    /// One entry per set, in set order
    pub sets: Vec<SetOutput>,
    /// MS1 scans left out because their polarity was unknown in a switching run
    pub unknown_polarity: usize,
}

impl ShardOutput {
    /// Total lines written across all sets and levels.
    pub fn lines_written(&self) -> u64 {
        self.sets
            .iter()
            .flat_map(|s| s.levels.iter())
            .map(|l| l.stats.lines)
            .sum()
    }
}

/// Artifact stem of every logical file, unique and stable across shards.
///
/// Named files use their file stem (`run.raw` becomes `run`); unnamed files use
/// `default`, numbered when the source holds more than one logical file.
pub fn assign_stems(names: &[Option<String>], default: &str) -> Vec<String> {
    let mut used = HashSet::new();
    names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let base = match name {
                Some(name) => Path::new(name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| name.clone()),
                None if names.len() > 1 => format!("{default}_{index}"),
                None => default.to_string(),
            };
            let stem = if used.contains(&base) {
                format!("{base}_{index}")
            } else {
                base
            };
            used.insert(stem.clone());
            stem
        })
        .collect()
}

/// Stem of one set: the file stem plus the polarity suffix.
pub fn set_stem(file_stem: &str, polarity: Polarity) -> String {
    format!("{file_stem}{}", polarity.file_suffix())
}
