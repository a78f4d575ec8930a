//! Joining the partial artifacts of all shards into one set of files.
//!
//! Shards cover consecutive m/z ranges, so data files are byte-appended in shard
//! order. Indexes are rebuilt with [`reconcile_index`], retention-time records
//! are unioned and re-sorted, and set summaries are absorbed into one.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::debug;

use super::error::TranslationError;
use crate::codec::{
    normalize_retention_times, read_index_file, read_retention_time_file, reconcile_index,
    write_index, write_retention_time_file, ArtifactPaths, ChromFileStats, ShardSegment,
};
use crate::shard::{LevelOutput, SetOutput, SetSummary, ShardOutput};

/// Merge `outputs` (in m/z order) into `output_dir`.
pub(crate) fn merge_shards(
    outputs: &[ShardOutput],
    output_dir: &Path,
    index_stride: u32,
) -> Result<Vec<SetOutput>, TranslationError> {
    let Some(first) = outputs.first() else {
        return Ok(Vec::new());
    };

    let mut merged = Vec::with_capacity(first.sets.len());
    for (set_index, template) in first.sets.iter().enumerate() {
        let parts = outputs
            .iter()
            .map(|output| {
                output
                    .sets
                    .get(set_index)
                    .filter(|s| s.key == template.key)
                    .ok_or_else(|| {
                        TranslationError::ShardMismatch(format!(
                            "shard {} is missing set '{}'",
                            output.shard,
                            template.paths.stem()
                        ))
                    })
            })
            .collect::<Result<Vec<&SetOutput>, _>>()?;

        let paths = template.paths.relocated(output_dir);
        let mut levels = Vec::with_capacity(template.levels.len());
        for level in template.levels.iter().map(|l| l.level) {
            let stats = merge_level(&parts, level, &paths, index_stride)?;
            if level >= 2 {
                merge_retention_times(&parts, level, &paths)?;
            }
            levels.push(LevelOutput { level, stats });
        }

        let mut summary = SetSummary::default();
        for part in &parts {
            summary.absorb(part.summary.clone());
        }
        debug!(
            "Merged set '{}' from {} shard(s)",
            paths.stem(),
            parts.len()
        );
        merged.push(SetOutput {
            key: template.key,
            paths,
            levels,
            summary,
        });
    }
    Ok(merged)
}

fn merge_level(
    parts: &[&SetOutput],
    level: u8,
    dest: &ArtifactPaths,
    stride: u32,
) -> Result<ChromFileStats, TranslationError> {
    let mut data = BufWriter::new(File::create(dest.chrom(level))?);
    let mut segments = Vec::with_capacity(parts.len());
    for part in parts {
        let stats = part
            .level(level)
            .map(|l| l.stats)
            .ok_or_else(|| {
                TranslationError::ShardMismatch(format!(
                    "set '{}' has no level {level} output",
                    part.paths.stem()
                ))
            })?;
        let source = part.paths.chrom(level);
        io::copy(&mut File::open(&source)?, &mut data)?;
        segments.push(ShardSegment {
            line_count: stats.lines,
            byte_len: stats.bytes,
            entries: read_index_file(part.paths.index(level))?,
            data: File::open(&source)?,
        });
    }
    data.flush()?;

    let entries = reconcile_index(&mut segments, stride)?;
    let mut index = BufWriter::new(File::create(dest.index(level))?);
    write_index(&mut index, &entries)?;
    index.flush()?;

    Ok(ChromFileStats {
        lines: segments.iter().map(|s| s.line_count).sum(),
        bytes: segments.iter().map(|s| s.byte_len).sum(),
        index_entries: entries.len(),
    })
}

fn merge_retention_times(
    parts: &[&SetOutput],
    level: u8,
    dest: &ArtifactPaths,
) -> Result<(), TranslationError> {
    let mut entries = Vec::new();
    for part in parts {
        entries.extend(read_retention_time_file(part.paths.rtt(level))?);
    }
    normalize_retention_times(&mut entries);
    write_retention_time_file(dest.rtt(level), &entries)?;
    Ok(())
}
