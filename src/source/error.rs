/// Errors raised by a scan consumer while accepting scans
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Scan data arrived before any source file was announced
    #[error("Scan data arrived before any header")]
    NoHeader,

    /// More scans arrived for a source file than its header declared
    #[error("Scan buffer for '{file}' is full ({capacity} scans declared by its header)")]
    BufferOverflow {
        /// Logical source file
        file: String,
        /// Declared scan count
        capacity: usize,
    },

    /// A fragmentation scan arrived with no MS1 scan to attach it to
    #[error("No base scan for MS{ms_level} subscan {scan}")]
    NoBaseScan {
        /// Scan number of the orphan
        scan: i32,
        /// Its MS level
        ms_level: u8,
    },
}

/// Errors that can occur while reading scans from a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A record could not be parsed
    #[error("JSON error on line {line}: {source}")]
    JsonError {
        /// 1-based line number
        line: usize,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A record parsed but violates the scan contract
    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord {
        /// 1-based line number
        line: usize,
        /// What is wrong with it
        reason: String,
    },

    /// The consumer rejected a scan
    #[error("Scan consumer error: {0}")]
    SinkError(#[from] SinkError),

    /// MSn sibling files next to an input holding several logical files
    #[error("MSn sibling files need a single logical file, main input announces {headers}")]
    AmbiguousSiblings {
        /// Header records in the main input
        headers: usize,
    },

    /// No reader exists for this file type
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}
