//! MSn-in-several-files inputs: `run.jsonl` holds MS1 scans (and the header),
//! `run.jsonl2`, `run.jsonl3`, ... hold the fragmentation scans of each level.

use std::path::{Path, PathBuf};

use super::error::{SinkError, SourceError};
use super::ndjson::NdjsonScanSource;
use super::{ScanSink, ScanSource};
use crate::scan::{MsnMode, Overview, Scan, ScanHeader};

/// Highest MS level probed for sibling files.
pub const MAX_SIBLING_LEVEL: u8 = 10;

/// Find sibling files `<file name><level>` for levels 2, 3, ... up to the first gap.
pub fn probe_msn_siblings<P: AsRef<Path>>(path: P) -> Vec<(u8, PathBuf)> {
    let path = path.as_ref();
    let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Vec::new();
    };
    let mut siblings = Vec::new();
    for level in 2..=MAX_SIBLING_LEVEL {
        let candidate = path.with_file_name(format!("{file_name}{level}"));
        if !candidate.is_file() {
            break;
        }
        siblings.push((level, candidate));
    }
    siblings
}

/// Wraps the consumer while the main file is read, adding the sibling scans to
/// the declared scan count of every logical file.
struct SiblingCounts<'a> {
    inner: &'a mut dyn ScanSink,
    extra: usize,
}

impl ScanSink for SiblingCounts<'_> {
    fn add_header(&mut self, mut header: ScanHeader) -> Result<(), SinkError> {
        header.scan_count += self.extra;
        self.inner.add_header(header)
    }

    fn add_scan(&mut self, scan: Scan) -> Result<(), SinkError> {
        self.inner.add_scan(scan)
    }

    fn last_base_scan(&self) -> Option<&Scan> {
        self.inner.last_base_scan()
    }

    fn add_parent_file_name(&mut self, name: &str) -> Result<(), SinkError> {
        self.inner.add_parent_file_name(name)
    }

    fn lower_threshold(&self) -> f64 {
        self.inner.lower_threshold()
    }

    fn upper_threshold(&self) -> f64 {
        self.inner.upper_threshold()
    }
}

/// Scan source over a main file plus its MSn sibling files.
///
/// Sibling files carry no header records; their scans are appended after the
/// main input and counted towards its header, so the main input must hold a
/// single logical file. Every sibling scan attaches to the last MS1 scan of the
/// main input, and sibling scans without a polarity take that scan's polarity.
/// Polarity-switching runs therefore need explicit polarities in their sibling
/// records.
pub struct MultiFileScanSource {
    main: NdjsonScanSource,
    siblings: Vec<(u8, NdjsonScanSource)>,
    sibling_counts: Option<usize>,
}

impl MultiFileScanSource {
    /// Open the main file and the given `(level, path)` siblings.
    ///
    /// Fails with [`SourceError::AmbiguousSiblings`] when there are siblings and
    /// the main file announces more than one logical file.
    pub fn open<P: AsRef<Path>>(path: P, siblings: Vec<(u8, PathBuf)>) -> Result<Self, SourceError> {
        let main = NdjsonScanSource::open(path)?;
        if !siblings.is_empty() {
            let headers = main.count_headers()?;
            if headers > 1 {
                return Err(SourceError::AmbiguousSiblings { headers });
            }
        }
        let siblings = siblings
            .into_iter()
            .map(|(level, path)| Ok((level, NdjsonScanSource::open(path)?)))
            .collect::<Result<Vec<_>, SourceError>>()?;
        Ok(Self {
            main,
            siblings,
            sibling_counts: None,
        })
    }

    /// Levels with a sibling file.
    pub fn sibling_levels(&self) -> Vec<u8> {
        self.siblings.iter().map(|(level, _)| *level).collect()
    }

    /// Number of scans in all sibling files.
    fn count_sibling_scans(&mut self) -> Result<usize, SourceError> {
        if let Some(count) = self.sibling_counts {
            return Ok(count);
        }
        let mut count = 0;
        for (_, sibling) in &self.siblings {
            count += sibling.count_scans()?;
        }
        self.sibling_counts = Some(count);
        Ok(count)
    }
}

impl ScanSource for MultiFileScanSource {
    fn name(&self) -> &str {
        self.main.name()
    }

    fn size_bytes(&self) -> u64 {
        self.main.size_bytes() + self.siblings.iter().map(|(_, s)| s.size_bytes()).sum::<u64>()
    }

    fn overview(&mut self, msn: MsnMode) -> Result<Overview, SourceError> {
        let mut overview = Overview::default();
        self.main.overview_into(msn, None, &mut overview)?;
        if !msn.is_enabled() {
            return Ok(overview);
        }
        let extra = self.count_sibling_scans()?;
        for (level, sibling) in &self.siblings {
            sibling.overview_into(msn, Some(*level), &mut overview)?;
        }
        for header in overview.headers.iter_mut() {
            header.scan_count += extra;
        }
        Ok(overview)
    }

    fn read(&mut self, sink: &mut dyn ScanSink) -> Result<(), SourceError> {
        let extra = self.count_sibling_scans()?;
        {
            let mut counted = SiblingCounts {
                inner: &mut *sink,
                extra,
            };
            self.main.read_into(&mut counted, None)?;
        }
        for (level, sibling) in &self.siblings {
            sibling.read_into(sink, Some(*level))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_probe_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("run.jsonl");
        fs::write(&main, "").unwrap();
        fs::write(dir.path().join("run.jsonl2"), "").unwrap();
        fs::write(dir.path().join("run.jsonl3"), "").unwrap();
        fs::write(dir.path().join("run.jsonl5"), "").unwrap();

        let levels: Vec<u8> = probe_msn_siblings(&main).into_iter().map(|(l, _)| l).collect();
        assert_eq!(levels, vec![2, 3]);
    }

    #[test]
    fn test_siblings_need_a_single_logical_file() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("multi.jsonl");
        fs::write(
            &main,
            concat!(
                r#"{"type":"header","scan_count":1,"file_name":"a.raw"}"#,
                "\n",
                r#"{"type":"scan","num":1,"ms_level":1,"rt":1.0,"mz":[401.0],"intensity":[1.0]}"#,
                "\n",
                r#"{"type":"header","scan_count":1,"file_name":"b.raw"}"#,
                "\n",
                r#"{"type":"scan","num":1,"ms_level":1,"rt":2.0,"mz":[402.0],"intensity":[2.0]}"#,
                "\n"
            ),
        )
        .unwrap();
        fs::write(
            dir.path().join("multi.jsonl2"),
            r#"{"type":"scan","num":2,"ms_level":2,"rt":2.1,"precursor_mz":402.0,"mz":[150.0],"intensity":[1.0]}"#,
        )
        .unwrap();

        let siblings = probe_msn_siblings(&main);
        assert!(matches!(
            MultiFileScanSource::open(&main, siblings),
            Err(SourceError::AmbiguousSiblings { headers: 2 })
        ));
        // Without siblings the same file is fine
        assert!(MultiFileScanSource::open(&main, Vec::new()).is_ok());
    }

    #[test]
    fn test_no_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("solo.jsonl");
        fs::write(&main, "").unwrap();
        assert!(probe_msn_siblings(&main).is_empty());
    }
}
