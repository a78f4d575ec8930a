use crate::codec::CodecError;
use crate::source::SinkError;

/// Errors that can occur inside a shard worker
#[derive(Debug, thiserror::Error)]
pub enum ShardError {
    /// Scan stream rejected (capacity or ordering problem)
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// I/O error while writing partial artifacts
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Encoding error
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    /// The supervisor abandoned this shard after a sibling failed
    #[error("Shard aborted")]
    Aborted,
}
