use crate::codec::CodecError;
use crate::header::HeaderError;
use crate::shard::{ShardError, ShardId};
use crate::source::SourceError;

/// The single failure a translation run surfaces to its caller.
///
/// Artifacts left in the output directory after an error are incomplete and
/// must not be used.
#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    /// Rejected configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The scan source failed (format error, or a consumer rejected a scan)
    #[error("Scan source error: {0}")]
    SourceError(#[from] SourceError),

    /// A shard worker failed
    #[error("Shard {shard} failed: {source}")]
    ShardError {
        /// Failing shard
        shard: ShardId,
        /// Underlying error
        #[source]
        source: ShardError,
    },

    /// A shard thread ended without reporting a result
    #[error("Shard {shard} worker thread panicked")]
    WorkerPanicked {
        /// Shard whose thread died
        shard: ShardId,
    },

    /// Shards disagree on the artifact sets they produced
    #[error("Shard outputs do not line up: {0}")]
    ShardMismatch(String),

    /// Encoding error during merge
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    /// Header could not be written
    #[error("Header error: {0}")]
    HeaderError(#[from] HeaderError),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TranslationError {
    pub(crate) fn shard(shard: ShardId, source: ShardError) -> Self {
        TranslationError::ShardError { shard, source }
    }
}
