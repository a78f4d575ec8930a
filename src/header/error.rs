/// Errors that can occur while reading or writing a `.head` file
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A non-comment line without `=`
    #[error("Malformed header line {line}: '{content}'")]
    MalformedLine {
        /// 1-based line number
        line: usize,
        /// Offending text
        content: String,
    },

    /// A required key is absent
    #[error("Missing header key '{0}'")]
    MissingKey(String),

    /// A value could not be parsed
    #[error("Invalid value for header key '{key}': '{value}'")]
    InvalidValue {
        /// Key
        key: String,
        /// Raw value
        value: String,
    },

    /// Written by a newer format revision
    #[error("Unsupported header format version {found} (this build reads up to {supported})")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version understood
        supported: u32,
    },
}
