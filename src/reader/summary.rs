use std::fmt;

use super::{ChromatogramReader, ReaderError};
use crate::scan::{MsnMode, Polarity};

/// Files of one level as found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    /// MS level
    pub level: u8,
    /// Scans with data on this level
    pub scans: usize,
    /// Data file size
    pub data_bytes: u64,
    /// Index records
    pub index_entries: usize,
}

/// Overview of an artifact set
#[derive(Debug, Clone)]
pub struct ChromSummary {
    /// Logical source file
    pub source_file: Option<String>,
    /// Set polarity
    pub polarity: Polarity,
    /// MSn handling the set was written with
    pub msn_mode: MsnMode,
    /// m/z covered (inclusive, exclusive)
    pub mz_range: (f64, f64),
    /// Retention times covered
    pub rt_range: (f32, f32),
    /// Lines per level
    pub lines: u64,
    /// Per-level details
    pub levels: Vec<LevelSummary>,
}

impl ChromatogramReader {
    /// Summarize the set, including on-disk file sizes.
    pub fn summary(&self) -> Result<ChromSummary, ReaderError> {
        let header = &self.header;
        let mut levels = Vec::with_capacity(self.levels.len());
        for files in &self.levels {
            let scans = if files.level == 1 {
                header.scan_count
            } else {
                header.msn_level(files.level).map_or(0, |l| l.scan_count)
            };
            levels.push(LevelSummary {
                level: files.level,
                scans,
                data_bytes: std::fs::metadata(&files.data)?.len(),
                index_entries: files.index.len(),
            });
        }

        Ok(ChromSummary {
            source_file: header.source_file.clone(),
            polarity: header.polarity,
            msn_mode: header.msn_mode,
            mz_range: (
                self.scale.to_mz(header.mz_lowest),
                self.scale.to_mz(header.mz_highest),
            ),
            rt_range: (header.start_rt, header.end_rt),
            lines: self.line_count(),
            levels,
        })
    }
}

impl fmt::Display for ChromSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Source:       {}",
            self.source_file.as_deref().unwrap_or("(unnamed)")
        )?;
        writeln!(f, "Polarity:     {}", self.polarity.as_str())?;
        writeln!(
            f,
            "m/z range:    {:.4} - {:.4} ({} lines)",
            self.mz_range.0, self.mz_range.1, self.lines
        )?;
        writeln!(
            f,
            "RT range:     {:.2} - {:.2} s",
            self.rt_range.0, self.rt_range.1
        )?;
        writeln!(
            f,
            "MSn:          {}",
            self.msn_mode.marker().unwrap_or("off")
        )?;
        for level in &self.levels {
            writeln!(
                f,
                "  MS{}: {} scans, {} bytes, {} index records",
                level.level, level.scans, level.data_bytes, level.index_entries
            )?;
        }
        Ok(())
    }
}
