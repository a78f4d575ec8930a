//! Index reconciliation for concatenated shard data files.
//!
//! Shards write their lines with a local index whose windows start at the
//! shard's own line 0. After byte-appending the data files, global windows start
//! at multiples of the stride counted from the first line of the first shard, so
//! a shard's local records are only reusable when its first line happens to sit on
//! a global boundary. For every global boundary the algorithm:
//!
//! 1. locates the shard containing that line,
//! 2. takes the shard's nearest local record at or before it,
//! 3. walks forward through the shard's data, counting newlines, to the exact
//!    line start (at most `stride - 1` lines),
//! 4. adds the byte length of all preceding shards.
//!
//! Boundaries at or past the total line count receive the total byte length, which
//! reproduces the extrapolated trailing record of an unsharded write. The output is
//! therefore identical to the index a single writer would have produced for the
//! concatenated data.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

use super::error::CodecError;
use super::index::{expected_entries, window_for_line, IndexEntry};

/// A shard's data file together with its local index.
#[derive(Debug)]
pub struct ShardSegment<R> {
    /// Lines in the shard's data file
    pub line_count: u64,
    /// Bytes in the shard's data file
    pub byte_len: u64,
    /// The shard's local index records
    pub entries: Vec<IndexEntry>,
    /// Seekable access to the shard's data file
    pub data: R,
}

/// Build the global index for the byte-concatenation of `segments`, in order.
pub fn reconcile_index<R: Read + Seek>(
    segments: &mut [ShardSegment<R>],
    stride: u32,
) -> Result<Vec<IndexEntry>, CodecError> {
    let stride = stride.max(1) as u64;
    let total_lines: u64 = segments.iter().map(|s| s.line_count).sum();
    let total_bytes: u64 = segments.iter().map(|s| s.byte_len).sum();

    let mut out = Vec::with_capacity(expected_entries(total_lines, stride as u32));
    let mut seg = 0usize;
    let mut base_line = 0u64;
    let mut base_byte = 0u64;

    for k in 0..=total_lines.div_ceil(stride) {
        let target = k * stride;
        if target >= total_lines {
            out.push(IndexEntry::new(target as i32, total_bytes as i64));
            continue;
        }

        while base_line + segments[seg].line_count <= target {
            base_line += segments[seg].line_count;
            base_byte += segments[seg].byte_len;
            seg += 1;
        }

        let local = target - base_line;
        let offset = local_line_offset(&mut segments[seg], local)?;
        out.push(IndexEntry::new(target as i32, (base_byte + offset) as i64));
    }

    Ok(out)
}

/// Byte offset of `line` inside one shard's data.
fn local_line_offset<R: Read + Seek>(
    segment: &mut ShardSegment<R>,
    line: u64,
) -> Result<u64, CodecError> {
    if line == 0 {
        return Ok(0);
    }

    let (start_line, start_offset) = match window_for_line(&segment.entries, line) {
        Some((entry, _)) => (entry.line as u64, entry.offset as u64),
        None => (0, 0),
    };
    if start_line == line {
        return Ok(start_offset);
    }

    segment.data.seek(SeekFrom::Start(start_offset))?;
    let mut reader = BufReader::new(&mut segment.data);
    let mut buf = Vec::new();
    let mut offset = start_offset;
    for current in start_line..line {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Err(CodecError::LineOutOfRange {
                line,
                available: current,
            });
        }
        offset += read as u64;
    }
    Ok(offset)
}
