/// Errors that can occur while encoding or decoding chromatogram artifacts
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A data line is not valid base64
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    /// A decoded line is not a whole number of (scan, intensity) pairs
    #[error("Malformed chromatogram line: {len} bytes is not a multiple of {record}")]
    MalformedLine {
        /// Decoded byte length
        len: usize,
        /// Size of one packed pair
        record: usize,
    },

    /// Index or retention-time file length is not a multiple of its record size
    #[error("Truncated {kind} file: {len} bytes is not a multiple of {record}")]
    TruncatedRecords {
        /// Which artifact ("index", "retention-time")
        kind: &'static str,
        /// File length in bytes
        len: u64,
        /// Record size in bytes
        record: usize,
    },

    /// m/z scale parameters cannot tile the axis
    #[error("Invalid m/z scale: {0}")]
    InvalidScale(String),

    /// A data file ended before the requested line
    #[error("Line {line} is beyond the end of the data ({available} lines)")]
    LineOutOfRange {
        /// Requested line
        line: u64,
        /// Lines available
        available: u64,
    },
}
