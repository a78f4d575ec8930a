//! Data line framing: packed `(i32 scan, f32 intensity)` pairs, base64 encoded.

use std::io::Cursor;

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::error::CodecError;

/// Size in bytes of one packed pair.
pub const LINE_ENTRY_LEN: usize = 8;

/// One scan's intensity within a chromatogram line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineEntry {
    /// Scan index (MS1 ordinal or MSn scan number)
    pub scan: i32,
    /// Intensity at this line's m/z bin
    pub intensity: f32,
}

impl LineEntry {
    /// Create a new entry.
    pub fn new(scan: i32, intensity: f32) -> Self {
        Self { scan, intensity }
    }
}

/// Encode entries into a base64 line (without the trailing newline).
///
/// An empty slice encodes to an empty string.
pub fn encode_line(entries: &[LineEntry]) -> String {
    let mut scratch = Vec::with_capacity(entries.len() * LINE_ENTRY_LEN);
    let mut out = String::new();
    encode_line_into(entries, &mut scratch, &mut out);
    out
}

/// Encode into caller-owned buffers so the hot loop does not allocate per line.
pub fn encode_line_into(entries: &[LineEntry], scratch: &mut Vec<u8>, out: &mut String) {
    scratch.clear();
    out.clear();
    if entries.is_empty() {
        return;
    }
    for entry in entries {
        // Writing into a Vec cannot fail.
        let _ = scratch.write_i32::<LittleEndian>(entry.scan);
        let _ = scratch.write_f32::<LittleEndian>(entry.intensity);
    }
    BASE64_STANDARD.encode_string(&scratch[..], out);
}

/// Decode a line produced by [`encode_line`]. A trailing newline is tolerated.
pub fn decode_line(line: &str) -> Result<Vec<LineEntry>, CodecError> {
    let trimmed = line.trim_end_matches(['\n', '\r']);
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let bytes = BASE64_STANDARD.decode(trimmed)?;
    if bytes.len() % LINE_ENTRY_LEN != 0 {
        return Err(CodecError::MalformedLine {
            len: bytes.len(),
            record: LINE_ENTRY_LEN,
        });
    }

    let mut cursor = Cursor::new(bytes.as_slice());
    let mut entries = Vec::with_capacity(bytes.len() / LINE_ENTRY_LEN);
    for _ in 0..bytes.len() / LINE_ENTRY_LEN {
        let scan = cursor.read_i32::<LittleEndian>()?;
        let intensity = cursor.read_f32::<LittleEndian>()?;
        entries.push(LineEntry { scan, intensity });
    }
    Ok(entries)
}
