//! # mzChrom - Seekable Chromatograms from Mass Spectrometry Scans
//!
//! `mzchrom` translates a stream of mass spectra into a set of line-oriented
//! chromatogram files, one line per integer m/z bin, so that the extracted ion
//! chromatogram of any m/z range can later be read with a single seek.
//!
//! ## Key Features
//!
//! - **Integer m/z grid**: every m/z is multiplied by a fixed factor and snapped
//!   to the lowest resolution step, so bins never suffer from float drift.
//!
//! - **Bounded memory**: the m/z range is cut into iterations sized from the
//!   input's byte count; each iteration re-reads the source and keeps only its
//!   own window in memory.
//!
//! - **Sharded translation**: inside an iteration, worker threads each own a
//!   slice of the grid and write partial artifacts that are merged byte-exactly
//!   into what a single worker would have written.
//!
//! - **MSn support**: fragmentation scans are written per level, either in full
//!   or as one total-ion-current entry at the precursor m/z.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mzchrom::reader::ChromatogramReader;
//! use mzchrom::translator::{Translator, TranslatorConfig};
//!
//! let mut translator = Translator::new(TranslatorConfig::default());
//! let stats = translator.translate_file("run.ndjson", "out")?;
//! println!("{stats}");
//!
//! let reader = ChromatogramReader::open("out/run.head")?;
//! let xic = reader.extract_chromatogram(1, 760.58, 760.59)?;
//! println!("apex: {:?}", xic.apex());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! This creates an artifact set:
//! ```text
//! out/
//! ├── run.head    # key=value header: grid, bounds, files, retention times
//! ├── run.chrom   # MS1 data lines
//! ├── run.idx     # MS1 line index
//! ├── run.chrom2  # MS2 data lines
//! ├── run.idx2    # MS2 line index
//! └── run.rtt2    # MS2 retention times
//! ```
//!
//! Runs that switch polarity produce `run_positive.*` and `run_negative.*` sets.
//!
//! ## Architecture
//!
//! - [`scan`]: scan data model and overview aggregates
//! - [`source`]: scan sources (NDJSON, multi-file MSn, in-memory) and the sink contract
//! - [`codec`]: integer m/z scale, line framing, index and retention-time files
//! - [`shard`]: per-shard workers that bin scans and write partial artifacts
//! - [`translator`]: partitioning, supervision, merging and header writing
//! - [`header`]: the `.head` property file
//! - [`reader`]: random access to finished artifact sets

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod codec;
pub mod header;
pub mod reader;
pub mod scan;
pub mod shard;
pub mod source;
pub mod translator;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::codec::{decode_line, encode_line, LineEntry, MzScale};
    pub use crate::header::{ChromHeader, HeaderError};
    pub use crate::reader::{ChromSummary, Chromatogram, ChromatogramReader, ReaderError};
    pub use crate::scan::{MsnMode, Overview, PeakArrays, Polarity, Scan, ScanHeader};
    pub use crate::source::{
        open_source, MemoryScanSource, NdjsonScanSource, NdjsonWriter, ScanSink, ScanSource,
        SourceError,
    };
    pub use crate::translator::{
        TranslationError, TranslationState, TranslationStats, Translator, TranslatorConfig,
    };
}
