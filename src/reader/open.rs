use std::path::Path;

use log::debug;

use super::{ChromatogramReader, LevelFiles, ReaderError};
use crate::codec::{expected_entries, read_index_file, MzScale};
use crate::header::ChromHeader;

impl ChromatogramReader {
    /// Open the artifact set described by a `.head` file.
    ///
    /// File names in the header are resolved against the header's directory.
    /// Every level's index is loaded and checked against the line count.
    pub fn open<P: AsRef<Path>>(head: P) -> Result<Self, ReaderError> {
        let head = head.as_ref();
        let header = ChromHeader::read(head)?;
        let dir = head.parent().unwrap_or(Path::new(".")).to_path_buf();
        let scale = MzScale::new(header.multiplication_factor, header.lowest_resolution)
            .map_err(|e| ReaderError::InvalidFormat(e.to_string()))?;
        let lines = scale.line_count(header.mz_lowest, header.mz_highest);

        let mut files = vec![(1u8, header.chrom_file.clone(), header.index_file.clone(), None)];
        for level in &header.msn_levels {
            files.push((
                level.level,
                level.chrom_file.clone(),
                level.index_file.clone(),
                Some(dir.join(&level.rtt_file)),
            ));
        }

        let mut levels = Vec::with_capacity(files.len());
        for (level, chrom, index, rtt) in files {
            let index = read_index_file(dir.join(&index))?;
            let expected = expected_entries(lines, header.index_stride);
            if index.len() != expected {
                return Err(ReaderError::InvalidFormat(format!(
                    "level {level} index has {} records, expected {expected}",
                    index.len()
                )));
            }
            levels.push(LevelFiles {
                level,
                data: dir.join(chrom),
                index,
                rtt,
            });
        }

        debug!(
            "Opened {} ({} lines, {} level(s))",
            head.display(),
            lines,
            levels.len()
        );
        Ok(Self {
            header,
            scale,
            dir,
            levels,
        })
    }
}
