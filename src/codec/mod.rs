//! # Chromatogram Codec
//!
//! On-disk building blocks of a chromatogram artifact set:
//!
//! - **Data file** (`.chrom[N]`): one line per m/z bin, each line the base64 framing
//!   of little-endian `(i32 scan, f32 intensity)` pairs for every scan with non-zero
//!   intensity at that bin. Empty bins are a bare newline.
//! - **Index file** (`.idx[N]`): little-endian `(i32 line, i64 byteOffset)` records at
//!   every multiple of the stride, plus one extrapolated record closing a partially
//!   filled trailing window.
//! - **Retention-time file** (`.rtt[N]`, N >= 2): `(i32 scan, f32 rt)` records sorted
//!   by scan number.
//!
//! m/z values are always handled as integers, see [`MzScale`].

mod error;
mod index;
mod line;
mod mz;
mod paths;
mod reconcile;
mod rtt;
mod writer;

pub use error::CodecError;
pub use index::{
    expected_entries, read_index, read_index_file, window_for_line, write_index, IndexEntry,
    ENTRIES_PER_INDEX, INDEX_RECORD_LEN,
};
pub use line::{decode_line, encode_line, encode_line_into, LineEntry, LINE_ENTRY_LEN};
pub use mz::MzScale;
pub use paths::{ArtifactPaths, CHROM_EXTENSION, HEAD_EXTENSION, INDEX_EXTENSION, RTT_EXTENSION};
pub use reconcile::{reconcile_index, ShardSegment};
pub use rtt::{
    normalize as normalize_retention_times, read_retention_time_file, read_retention_times,
    write_retention_time_file, write_retention_times, RetentionTimeEntry, RTT_RECORD_LEN,
};
pub use writer::{ChromFileStats, ChromFileWriter};
