//! # Scan Sources
//!
//! The translator never parses instrument files itself. A [`ScanSource`] walks its
//! input once per read pass and pushes scans into a [`ScanSink`]:
//!
//! 1. [`ScanSink::add_header`] once per logical source file, before its scans
//! 2. [`ScanSink::add_parent_file_name`] whenever the logical file name becomes known
//! 3. [`ScanSink::add_scan`] once per spectrum, in non-decreasing scan order
//!
//! Sources may consult [`ScanSink::lower_threshold`]/[`ScanSink::upper_threshold`]
//! to skip peaks no consumer will accept, which keeps memory proportional to the
//! current iteration's m/z window.
//!
//! Fragmentation scans are attached to the most recent MS1 scan by the consumer;
//! [`ScanSink::last_base_scan`] exposes that scan to sources that need to inspect it.

mod dispatch;
mod error;
mod memory;
mod multi;
mod ndjson;

use std::path::Path;

use crate::scan::{MsnMode, Overview, Scan, ScanHeader};

pub use dispatch::ScanDispatcher;
pub use error::{SinkError, SourceError};
pub use memory::MemoryScanSource;
pub use multi::{probe_msn_siblings, MultiFileScanSource, MAX_SIBLING_LEVEL};
pub use ndjson::{NdjsonScanSource, NdjsonWriter};

/// Consumer side of the scan stream.
pub trait ScanSink {
    /// Start a new logical source file with the declared scan count.
    fn add_header(&mut self, header: ScanHeader) -> Result<(), SinkError>;

    /// Accept one spectrum of the current source file.
    fn add_scan(&mut self, scan: Scan) -> Result<(), SinkError>;

    /// The most recent MS1 scan of the current source file.
    fn last_base_scan(&self) -> Option<&Scan>;

    /// Name (or rename) the current logical source file.
    fn add_parent_file_name(&mut self, name: &str) -> Result<(), SinkError>;

    /// Lowest m/z this consumer accepts (inclusive).
    fn lower_threshold(&self) -> f64;

    /// Highest m/z this consumer accepts (exclusive).
    fn upper_threshold(&self) -> f64;
}

/// Producer side of the scan stream.
pub trait ScanSource {
    /// Stem used for artifacts when the source does not name its logical files.
    fn name(&self) -> &str;

    /// Size of the input in bytes, used to decide the number of iterations.
    fn size_bytes(&self) -> u64;

    /// Cheap first pass: global m/z bounds, MS levels, polarity switching and
    /// per-file headers, without materialising peak data.
    ///
    /// MSn scans only widen the m/z bounds in [`MsnMode::Full`].
    fn overview(&mut self, msn: MsnMode) -> Result<Overview, SourceError>;

    /// Full pass: push every header and scan into `sink`.
    fn read(&mut self, sink: &mut dyn ScanSink) -> Result<(), SourceError>;
}

/// Supported input file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Newline-delimited JSON scan records
    Ndjson,
}

impl SourceFormat {
    /// Resolve the format from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jsonl" | "ndjson" | "json" => Ok(SourceFormat::Ndjson),
            _ => Err(SourceError::UnsupportedFormat(format!(
                "{} (expected .jsonl or .ndjson)",
                path.as_ref().display()
            ))),
        }
    }
}

/// Open the appropriate scan source for a file.
///
/// MSn-in-several-files inputs are detected by probing for sibling files named
/// `<file name><level>`; when any exist a [`MultiFileScanSource`] is returned.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<Box<dyn ScanSource>, SourceError> {
    let path = path.as_ref();
    match SourceFormat::from_path(path)? {
        SourceFormat::Ndjson => {
            let siblings = probe_msn_siblings(path);
            if siblings.is_empty() {
                Ok(Box::new(NdjsonScanSource::open(path)?))
            } else {
                log::info!(
                    "Detected {} MSn sibling file(s) for {}",
                    siblings.len(),
                    path.display()
                );
                Ok(Box::new(MultiFileScanSource::open(path, siblings)?))
            }
        }
    }
}

/// m/z range a scan contributes to the global bounds, given the MSn mode.
pub fn overview_range(scan: &Scan, msn: MsnMode) -> Option<(f64, f64)> {
    if scan.ms_level <= 1 || msn == MsnMode::Full {
        scan.mz_range()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_path("run.jsonl").unwrap(), SourceFormat::Ndjson);
        assert_eq!(SourceFormat::from_path("RUN.NDJSON").unwrap(), SourceFormat::Ndjson);
        assert!(matches!(
            SourceFormat::from_path("run.raw"),
            Err(SourceError::UnsupportedFormat(_))
        ));
    }
}
