//! Windowed batch fill: turns per-scan peak lists into per-bin data lines.
//!
//! Bins are processed in blocks of `batch_bins`. For each block a
//! `batch_bins x scans` grid is accumulated by advancing one monotone cursor per
//! scan through its (m/z sorted) peaks, so every peak is visited exactly once and
//! a scan's cost per block is one comparison when it has no peaks there.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use super::error::ShardError;
use crate::codec::{ChromFileWriter, LineEntry, MzScale};

/// One column of the grid: a scan id plus its m/z sorted peaks.
#[derive(Debug)]
pub(crate) struct Track<'a> {
    id: i32,
    mz: &'a [f64],
    intensity: &'a [f32],
    cursor: usize,
}

impl<'a> Track<'a> {
    pub(crate) fn new(id: i32, mz: &'a [f64], intensity: &'a [f32]) -> Self {
        Self {
            id,
            mz,
            intensity,
            cursor: 0,
        }
    }
}

/// Write one line per bin of `[lower, upper)` (integer m/z, step aligned).
pub(crate) fn write_tracks<W: Write>(
    writer: &mut ChromFileWriter<W>,
    tracks: &mut [Track<'_>],
    scale: &MzScale,
    lower: i64,
    upper: i64,
    batch_bins: usize,
    abort: &AtomicBool,
) -> Result<(), ShardError> {
    let step = scale.step();
    let batch_bins = batch_bins.max(1);
    let columns = tracks.len();

    for track in tracks.iter_mut() {
        track.cursor = track.mz.partition_point(|&mz| scale.to_int(mz) < lower);
    }

    let mut grid = vec![0f32; batch_bins * columns];
    let mut entries: Vec<LineEntry> = Vec::with_capacity(columns);
    let mut block_start = lower;

    while block_start < upper {
        if abort.load(Ordering::Relaxed) {
            return Err(ShardError::Aborted);
        }
        let block_end = (block_start + step * batch_bins as i64).min(upper);
        let bins = ((block_end - block_start) / step) as usize;
        grid[..bins * columns].fill(0.0);

        for (column, track) in tracks.iter_mut().enumerate() {
            while track.cursor < track.mz.len() {
                let value = scale.to_int(track.mz[track.cursor]);
                if value >= block_end {
                    break;
                }
                let bin = ((value - block_start) / step) as usize;
                grid[bin * columns + column] += track.intensity[track.cursor];
                track.cursor += 1;
            }
        }

        for bin in 0..bins {
            entries.clear();
            let row = &grid[bin * columns..(bin + 1) * columns];
            for (track, &intensity) in tracks.iter().zip(row) {
                if intensity != 0.0 {
                    entries.push(LineEntry::new(track.id, intensity));
                }
            }
            writer.write_line(&entries)?;
        }
        block_start = block_end;
    }
    Ok(())
}
