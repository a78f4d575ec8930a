use crate::codec::CodecError;
use crate::header::HeaderError;

/// Errors that can occur while reading chromatogram artifacts
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Header could not be parsed
    #[error("Header error: {0}")]
    HeaderError(#[from] HeaderError),

    /// Data, index or retention-time file could not be decoded
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    /// The set has no artifacts for this MS level
    #[error("No artifacts for MS level {0}")]
    MissingLevel(u8),

    /// Line number past the end of the data file
    #[error("Line {line} out of range ({lines} lines)")]
    LineOutOfRange {
        /// Requested line
        line: u64,
        /// Lines per level
        lines: u64,
    },

    /// Artifacts disagree with each other
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}
