//! Retention-time records for MS-level >= 2: `(i32 scan, f32 rt)` pairs sorted by scan.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::error::CodecError;

/// Size in bytes of one retention-time record.
pub const RTT_RECORD_LEN: usize = 8;

/// Retention time of one MSn scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionTimeEntry {
    /// Scan number
    pub scan: i32,
    /// Retention time in seconds
    pub retention_time: f32,
}

impl RetentionTimeEntry {
    /// Create a new record.
    pub fn new(scan: i32, retention_time: f32) -> Self {
        Self {
            scan,
            retention_time,
        }
    }
}

/// Sort by scan number and drop repeated scan numbers (first occurrence wins).
pub fn normalize(entries: &mut Vec<RetentionTimeEntry>) {
    entries.sort_by_key(|e| e.scan);
    entries.dedup_by_key(|e| e.scan);
}

/// Write records in the given order.
pub fn write_retention_times<W: Write>(
    writer: &mut W,
    entries: &[RetentionTimeEntry],
) -> std::io::Result<()> {
    for entry in entries {
        writer.write_i32::<LittleEndian>(entry.scan)?;
        writer.write_f32::<LittleEndian>(entry.retention_time)?;
    }
    Ok(())
}

/// Create (truncate) a retention-time file and write `entries` to it.
pub fn write_retention_time_file<P: AsRef<Path>>(
    path: P,
    entries: &[RetentionTimeEntry],
) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_retention_times(&mut writer, entries)?;
    writer.flush()
}

/// Read every record from a stream.
pub fn read_retention_times<R: Read>(reader: &mut R) -> Result<Vec<RetentionTimeEntry>, CodecError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.len() % RTT_RECORD_LEN != 0 {
        return Err(CodecError::TruncatedRecords {
            kind: "retention-time",
            len: bytes.len() as u64,
            record: RTT_RECORD_LEN,
        });
    }

    let mut slice = bytes.as_slice();
    let mut entries = Vec::with_capacity(bytes.len() / RTT_RECORD_LEN);
    while !slice.is_empty() {
        let scan = slice.read_i32::<LittleEndian>()?;
        let retention_time = slice.read_f32::<LittleEndian>()?;
        entries.push(RetentionTimeEntry {
            scan,
            retention_time,
        });
    }
    Ok(entries)
}

/// Read a retention-time file from disk.
pub fn read_retention_time_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<RetentionTimeEntry>, CodecError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_retention_times(&mut reader)
}
