//! Append-only writer for a data file and its sparse index.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::index::IndexEntry;
use super::line::{encode_line_into, LineEntry};

/// Totals of a finished data/index pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChromFileStats {
    /// Data lines written
    pub lines: u64,
    /// Bytes written to the data file
    pub bytes: u64,
    /// Index records written
    pub index_entries: usize,
}

/// Streaming writer producing one data line per m/z bin and index records at
/// stride boundaries.
pub struct ChromFileWriter<W: Write> {
    data: W,
    index: W,
    stride: u32,
    lines: u64,
    bytes: u64,
    index_entries: usize,
    scratch: Vec<u8>,
    encoded: String,
}

impl ChromFileWriter<BufWriter<File>> {
    /// Create (truncate) the data and index files.
    pub fn create<P: AsRef<Path>, Q: AsRef<Path>>(
        data_path: P,
        index_path: Q,
        stride: u32,
    ) -> std::io::Result<Self> {
        let data = BufWriter::new(File::create(data_path)?);
        let index = BufWriter::new(File::create(index_path)?);
        Self::new(data, index, stride)
    }
}

impl<W: Write> ChromFileWriter<W> {
    /// Wrap arbitrary sinks. Writes the leading `(0, 0)` index record.
    pub fn new(data: W, index: W, stride: u32) -> std::io::Result<Self> {
        let mut writer = Self {
            data,
            index,
            stride: stride.max(1),
            lines: 0,
            bytes: 0,
            index_entries: 0,
            scratch: Vec::new(),
            encoded: String::new(),
        };
        writer.push_index(0)?;
        Ok(writer)
    }

    fn push_index(&mut self, line: u64) -> std::io::Result<()> {
        IndexEntry::new(line as i32, self.bytes as i64).write_to(&mut self.index)?;
        self.index_entries += 1;
        Ok(())
    }

    /// Append one line.
    pub fn write_line(&mut self, entries: &[LineEntry]) -> std::io::Result<()> {
        encode_line_into(entries, &mut self.scratch, &mut self.encoded);
        self.data.write_all(self.encoded.as_bytes())?;
        self.data.write_all(b"\n")?;
        self.bytes += self.encoded.len() as u64 + 1;
        self.lines += 1;

        if self.lines % self.stride as u64 == 0 {
            self.push_index(self.lines)?;
        }
        Ok(())
    }

    /// Lines written so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Close the trailing partial window and flush both sinks.
    pub fn finish(mut self) -> std::io::Result<(ChromFileStats, W, W)> {
        let stride = self.stride as u64;
        if self.lines % stride != 0 {
            let extrapolated = self.lines.div_ceil(stride) * stride;
            self.push_index(extrapolated)?;
        }
        self.data.flush()?;
        self.index.flush()?;
        let stats = ChromFileStats {
            lines: self.lines,
            bytes: self.bytes,
            index_entries: self.index_entries,
        };
        Ok((stats, self.data, self.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::index::{expected_entries, read_index};

    fn write_lines(count: u64, stride: u32) -> (ChromFileStats, Vec<u8>, Vec<IndexEntry>) {
        let mut writer = ChromFileWriter::new(Vec::new(), Vec::new(), stride).unwrap();
        for i in 0..count {
            if i % 2 == 0 {
                writer.write_line(&[LineEntry::new(i as i32, 1.0)]).unwrap();
            } else {
                writer.write_line(&[]).unwrap();
            }
        }
        let (stats, data, index) = writer.finish().unwrap();
        let entries = read_index(&mut index.as_slice()).unwrap();
        (stats, data, entries)
    }

    #[test]
    fn test_full_windows() {
        let (stats, data, entries) = write_lines(8, 4);
        assert_eq!(stats.lines, 8);
        assert_eq!(entries.len(), expected_entries(8, 4));
        assert_eq!(entries.last().unwrap().line, 8);
        assert_eq!(entries.last().unwrap().offset, data.len() as i64);
    }

    #[test]
    fn test_partial_trailing_window_is_extrapolated() {
        let (stats, data, entries) = write_lines(5, 4);
        assert_eq!(stats.index_entries, 3);
        assert_eq!(entries[0], IndexEntry::new(0, 0));
        assert_eq!(entries[2].line, 8);
        assert_eq!(entries[2].offset, data.len() as i64);
    }

    #[test]
    fn test_offsets_point_at_line_starts() {
        let (_, data, entries) = write_lines(9, 2);
        for entry in entries.iter().filter(|e| (e.offset as usize) < data.len()) {
            let before = &data[..entry.offset as usize];
            let newlines = before.iter().filter(|&&b| b == b'\n').count();
            assert_eq!(newlines as i32, entry.line);
        }
    }

    #[test]
    fn test_empty_file_has_origin_record() {
        let (stats, data, entries) = write_lines(0, 4);
        assert_eq!(stats.lines, 0);
        assert!(data.is_empty());
        assert_eq!(entries, vec![IndexEntry::new(0, 0)]);
    }
}
