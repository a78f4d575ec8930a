//! Sparse line index.
//!
//! A record `(line, offset)` is stored for every line number that is a multiple
//! of the stride, starting at `(0, 0)` and ending with the first multiple that is
//! `>=` the line count. That last record is extrapolated past the final line and
//! carries the end-of-file offset, so every window (including a partially filled
//! trailing one) is bounded on both sides.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::error::CodecError;

/// Size in bytes of one index record.
pub const INDEX_RECORD_LEN: usize = 12;

/// Default number of data lines per index window.
pub const ENTRIES_PER_INDEX: u32 = 1000;

/// One index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexEntry {
    /// Line number (multiple of the stride)
    pub line: i32,
    /// Byte offset of that line, or end of file for extrapolated records
    pub offset: i64,
}

impl IndexEntry {
    /// Create a new record.
    pub fn new(line: i32, offset: i64) -> Self {
        Self { line, offset }
    }

    /// Append the fixed-width encoding to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i32::<LittleEndian>(self.line)?;
        writer.write_i64::<LittleEndian>(self.offset)
    }
}

/// Number of records an index of `line_count` lines carries.
pub fn expected_entries(line_count: u64, stride: u32) -> usize {
    (line_count.div_ceil(stride as u64) + 1) as usize
}

/// Write a complete index.
pub fn write_index<W: Write>(writer: &mut W, entries: &[IndexEntry]) -> std::io::Result<()> {
    for entry in entries {
        entry.write_to(writer)?;
    }
    Ok(())
}

/// Read every record from an index stream.
pub fn read_index<R: Read>(reader: &mut R) -> Result<Vec<IndexEntry>, CodecError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.len() % INDEX_RECORD_LEN != 0 {
        return Err(CodecError::TruncatedRecords {
            kind: "index",
            len: bytes.len() as u64,
            record: INDEX_RECORD_LEN,
        });
    }

    let mut slice = bytes.as_slice();
    let mut entries = Vec::with_capacity(bytes.len() / INDEX_RECORD_LEN);
    while !slice.is_empty() {
        let line = slice.read_i32::<LittleEndian>()?;
        let offset = slice.read_i64::<LittleEndian>()?;
        entries.push(IndexEntry { line, offset });
    }
    Ok(entries)
}

/// Read an index file from disk.
pub fn read_index_file<P: AsRef<Path>>(path: P) -> Result<Vec<IndexEntry>, CodecError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_index(&mut reader)
}

/// Largest record with `line <= target`, with its successor's offset as the
/// window end when one exists.
pub fn window_for_line(entries: &[IndexEntry], target: u64) -> Option<(IndexEntry, Option<i64>)> {
    let pos = entries.partition_point(|e| (e.line as i64) <= target as i64);
    if pos == 0 {
        return None;
    }
    let start = entries[pos - 1];
    let end = entries.get(pos).map(|e| e.offset);
    Some((start, end))
}
