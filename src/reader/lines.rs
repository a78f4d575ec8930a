use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};

use super::{ChromatogramReader, ReaderError};
use crate::codec::{decode_line, read_retention_time_file, window_for_line, LineEntry};

/// Intensity over retention time for an m/z window of one level.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromatogram {
    /// MS level
    pub level: u8,
    /// Requested m/z window
    pub mz_range: (f64, f64),
    /// Scan ids (MS1 ordinals on level 1, scan numbers above)
    pub scans: Vec<i32>,
    /// Retention time per scan
    pub retention_times: Vec<f32>,
    /// Summed intensity per scan
    pub intensities: Vec<f32>,
}

impl Chromatogram {
    /// Number of points.
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// True when there are no points.
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Largest intensity and the retention time it occurs at.
    pub fn apex(&self) -> Option<(f32, f32)> {
        self.retention_times
            .iter()
            .zip(&self.intensities)
            .filter(|(_, i)| **i > 0.0)
            .fold(None, |best: Option<(f32, f32)>, (&rt, &i)| match best {
                Some((_, top)) if top >= i => best,
                _ => Some((rt, i)),
            })
    }
}

fn read_raw_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<(), ReaderError> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Err(ReaderError::InvalidFormat(
            "data file ends before the indexed line".into(),
        ));
    }
    Ok(())
}

fn decode_raw(buf: &[u8]) -> Result<Vec<LineEntry>, ReaderError> {
    let text = std::str::from_utf8(buf)
        .map_err(|_| ReaderError::InvalidFormat("data line is not ASCII".into()))?;
    Ok(decode_line(text.trim_end_matches('\n'))?)
}

impl ChromatogramReader {
    /// Entries of one data line.
    pub fn read_line(&self, level: u8, line: u64) -> Result<Vec<LineEntry>, ReaderError> {
        let mut lines = self.read_lines(level, line, 1)?;
        Ok(lines.pop().unwrap_or_default())
    }

    /// Entries of `count` consecutive lines starting at `first`.
    pub fn read_lines(
        &self,
        level: u8,
        first: u64,
        count: u64,
    ) -> Result<Vec<Vec<LineEntry>>, ReaderError> {
        let files = self.level(level)?;
        let lines = self.line_count();
        let end = first.saturating_add(count);
        if count == 0 {
            return Ok(Vec::new());
        }
        if end > lines {
            return Err(ReaderError::LineOutOfRange {
                line: end - 1,
                lines,
            });
        }

        let (window, _) = window_for_line(&files.index, first).ok_or_else(|| {
            ReaderError::InvalidFormat(format!("index does not cover line {first}"))
        })?;
        let mut reader = BufReader::new(File::open(&files.data)?);
        reader.seek(SeekFrom::Start(window.offset as u64))?;

        let mut buf = Vec::new();
        for _ in window.line as u64..first {
            read_raw_line(&mut reader, &mut buf)?;
        }
        let mut out = Vec::with_capacity(count as usize);
        for _ in first..end {
            read_raw_line(&mut reader, &mut buf)?;
            out.push(decode_raw(&buf)?);
        }
        Ok(out)
    }

    /// Scan ids of a level with their retention times.
    ///
    /// Level 1 lists every MS1 ordinal; higher levels list the scans of the
    /// retention-time file, ascending by scan number.
    pub fn retention_times(&self, level: u8) -> Result<Vec<(i32, f32)>, ReaderError> {
        let files = self.level(level)?;
        match &files.rtt {
            None => Ok(self
                .header
                .retention_times
                .iter()
                .enumerate()
                .map(|(ordinal, rt)| (ordinal as i32, *rt))
                .collect()),
            Some(path) => Ok(read_retention_time_file(path)?
                .into_iter()
                .map(|e| (e.scan, e.retention_time))
                .collect()),
        }
    }

    /// Sum every line touching `[lower_mz, upper_mz]` into one chromatogram.
    ///
    /// Every scan of the level appears, with zero intensity where it has no
    /// signal in the window. The window is clamped to the set's m/z range.
    pub fn extract_chromatogram(
        &self,
        level: u8,
        lower_mz: f64,
        upper_mz: f64,
    ) -> Result<Chromatogram, ReaderError> {
        let times = self.retention_times(level)?;
        let mut chromatogram = Chromatogram {
            level,
            mz_range: (lower_mz, upper_mz),
            scans: times.iter().map(|(s, _)| *s).collect(),
            retention_times: times.iter().map(|(_, rt)| *rt).collect(),
            intensities: vec![0.0; times.len()],
        };

        if let Some((first, last)) = self.line_span(lower_mz, upper_mz) {
            let position: HashMap<i32, usize> = chromatogram
                .scans
                .iter()
                .enumerate()
                .map(|(i, s)| (*s, i))
                .collect();
            for line in self.read_lines(level, first, last - first + 1)? {
                for entry in line {
                    if let Some(&i) = position.get(&entry.scan) {
                        chromatogram.intensities[i] += entry.intensity;
                    }
                }
            }
        }
        Ok(chromatogram)
    }

    /// Inclusive line span of an m/z window, clamped to the set.
    fn line_span(&self, lower_mz: f64, upper_mz: f64) -> Option<(u64, u64)> {
        let lines = self.line_count();
        if lines == 0 || upper_mz < lower_mz {
            return None;
        }
        let step = self.scale.step();
        let lowest = self.header.mz_lowest;
        let highest = self.header.mz_highest - 1;
        let lo = self.scale.to_int(lower_mz).max(lowest);
        let hi = self.scale.to_int(upper_mz).min(highest);
        if lo > hi {
            return None;
        }
        Some((((lo - lowest) / step) as u64, ((hi - lowest) / step) as u64))
    }
}
