//! Newline-delimited JSON scan interchange.
//!
//! One JSON object per line, discriminated by `type`:
//!
//! ```text
//! {"type":"header","scan_count":3,"file_name":"run"}
//! {"type":"parent_file","name":"run_a"}
//! {"type":"scan","num":0,"ms_level":1,"rt":1.0,"polarity":"positive","mz":[400.0],"intensity":[10.0]}
//! ```
//!
//! Optional scan attributes (`low_mz`, `high_mz`, `base_peak_mz`,
//! `base_peak_intensity`, `tic`) are derived from the peaks when absent.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use super::error::SourceError;
use super::{overview_range, ScanSink, ScanSource};
use crate::scan::{MsnMode, Overview, PeakArrays, Polarity, Scan, ScanHeader};

#[derive(Debug, Serialize, Deserialize)]
struct HeaderRecord {
    scan_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
}

impl HeaderRecord {
    fn into_header(self) -> ScanHeader {
        ScanHeader {
            file_name: self.file_name,
            ..ScanHeader::new(self.scan_count)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ScanRecord {
    num: i32,
    ms_level: u8,
    rt: f32,
    #[serde(default)]
    polarity: Polarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    low_mz: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    high_mz: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_peak_mz: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_peak_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tic: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precursor_mz: Option<f64>,
    #[serde(default)]
    mz: Vec<f64>,
    #[serde(default)]
    intensity: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record {
    Header(HeaderRecord),
    ParentFile { name: String },
    Scan(ScanRecord),
}

/// Smallest and largest value of an m/z array, computed while parsing.
#[derive(Debug, Default)]
struct MzExtent(Option<(f64, f64)>);

impl<'de> Deserialize<'de> for MzExtent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ExtentVisitor;

        impl<'de> Visitor<'de> for ExtentVisitor {
            type Value = MzExtent;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an array of m/z values")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MzExtent, A::Error> {
                let mut extent: Option<(f64, f64)> = None;
                while let Some(value) = seq.next_element::<f64>()? {
                    extent = Some(match extent {
                        None => (value, value),
                        Some((lo, hi)) => (lo.min(value), hi.max(value)),
                    });
                }
                Ok(MzExtent(extent))
            }
        }

        deserializer.deserialize_seq(ExtentVisitor)
    }
}

/// Scan record without its peak arrays (overview pass).
#[derive(Debug, Deserialize)]
struct ScanSummaryRecord {
    num: i32,
    ms_level: u8,
    rt: f32,
    #[serde(default)]
    polarity: Polarity,
    low_mz: Option<f32>,
    high_mz: Option<f32>,
    precursor_mz: Option<f64>,
    #[serde(default)]
    mz: MzExtent,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SummaryRecord {
    Header(HeaderRecord),
    ParentFile { name: String },
    Scan(ScanSummaryRecord),
}

fn invalid(line: usize, reason: impl Into<String>) -> SourceError {
    SourceError::InvalidRecord {
        line,
        reason: reason.into(),
    }
}

impl ScanRecord {
    fn from_scan(scan: &Scan) -> Self {
        Self {
            num: scan.num,
            ms_level: scan.ms_level,
            rt: scan.retention_time,
            polarity: scan.polarity,
            low_mz: Some(scan.low_mz),
            high_mz: Some(scan.high_mz),
            base_peak_mz: Some(scan.base_peak_mz),
            base_peak_intensity: Some(scan.base_peak_intensity),
            tic: Some(scan.total_ion_current),
            precursor_mz: scan.precursor_mz,
            mz: scan.peaks.mz.clone(),
            intensity: scan.peaks.intensity.clone(),
        }
    }

    /// Convert to a scan, keeping only peaks in `[lower, upper)`. Statistics and
    /// acquisition range are taken from the complete peak list.
    fn into_scan(self, line: usize, lower: f64, upper: f64) -> Result<Scan, SourceError> {
        if self.ms_level == 0 {
            return Err(invalid(line, format!("scan {} has ms_level 0", self.num)));
        }
        let mut peaks = PeakArrays::new(self.mz, self.intensity);
        peaks
            .validate()
            .map_err(|reason| invalid(line, format!("scan {}: {reason}", self.num)))?;
        peaks.sort_by_mz();

        let mut scan = Scan::new_ms1(self.num, self.rt, self.polarity, peaks);
        scan.ms_level = self.ms_level;
        scan.precursor_mz = self.precursor_mz;
        if let Some(low) = self.low_mz {
            scan.low_mz = low;
        }
        if let Some(high) = self.high_mz {
            scan.high_mz = high;
        }
        if let Some(mz) = self.base_peak_mz {
            scan.base_peak_mz = mz;
        }
        if let Some(intensity) = self.base_peak_intensity {
            scan.base_peak_intensity = intensity;
        }
        if let Some(tic) = self.tic {
            scan.total_ion_current = tic;
        }

        if lower.is_finite() || upper.is_finite() {
            scan.peaks = scan.peaks.window(lower, upper);
        }
        Ok(scan)
    }
}

impl ScanSummaryRecord {
    fn into_scan(self) -> Scan {
        let mut scan = Scan::new_ms1(self.num, self.rt, self.polarity, PeakArrays::default());
        scan.ms_level = self.ms_level;
        scan.precursor_mz = self.precursor_mz;
        let (lo, hi) = self.mz.0.unwrap_or((0.0, 0.0));
        scan.low_mz = self.low_mz.unwrap_or(lo as f32);
        scan.high_mz = self.high_mz.unwrap_or(hi as f32);
        scan
    }
}

/// Iterate the non-blank lines of a file with their 1-based line numbers.
fn for_each_line<F>(path: &Path, mut f: F) -> Result<(), SourceError>
where
    F: FnMut(usize, &str) -> Result<(), SourceError>,
{
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = String::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            return Ok(());
        }
        line_no += 1;
        let line = buf.trim();
        if !line.is_empty() {
            f(line_no, line)?;
        }
    }
}

fn parse<'a, T: Deserialize<'a>>(line_no: usize, line: &'a str) -> Result<T, SourceError> {
    serde_json::from_str(line).map_err(|source| SourceError::JsonError {
        line: line_no,
        source,
    })
}

/// Scan source reading newline-delimited JSON records.
#[derive(Debug, Clone)]
pub struct NdjsonScanSource {
    path: PathBuf,
    name: String,
    size: u64,
}

impl NdjsonScanSource {
    /// Open a file; the artifact stem defaults to its file stem.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let size = std::fs::metadata(&path)?.len();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chromatogram".to_string());
        Ok(Self { path, name, size })
    }

    /// Input path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Push the file's records into `sink`.
    ///
    /// With `only_level` set the file is treated as an MSn sibling: header and
    /// parent-file records are skipped and every scan must have that level.
    pub(crate) fn read_into(
        &self,
        sink: &mut dyn ScanSink,
        only_level: Option<u8>,
    ) -> Result<(), SourceError> {
        let (lower, upper) = (sink.lower_threshold(), sink.upper_threshold());
        let mut seen_header = only_level.is_some();

        for_each_line(&self.path, |line_no, line| {
            match parse::<Record>(line_no, line)? {
                Record::Header(header) => {
                    if only_level.is_none() {
                        seen_header = true;
                        sink.add_header(header.into_header())?;
                    }
                }
                Record::ParentFile { name } => {
                    if only_level.is_none() {
                        sink.add_parent_file_name(&name)?;
                    }
                }
                Record::Scan(record) => {
                    if !seen_header {
                        return Err(invalid(line_no, "scan record before any header"));
                    }
                    if let Some(level) = only_level {
                        if record.ms_level != level {
                            return Err(invalid(
                                line_no,
                                format!(
                                    "MS{} scan {} in MS{level} sibling file",
                                    record.ms_level, record.num
                                ),
                            ));
                        }
                    }
                    sink.add_scan(record.into_scan(line_no, lower, upper)?)?;
                }
            }
            Ok(())
        })
    }

    /// Fold this file's records into `overview`.
    ///
    /// With `only_level` set, header records are skipped and scans are credited
    /// to the last header already present in `overview`.
    pub(crate) fn overview_into(
        &self,
        msn: MsnMode,
        only_level: Option<u8>,
        overview: &mut Overview,
    ) -> Result<(), SourceError> {
        for_each_line(&self.path, |line_no, line| {
            match parse::<SummaryRecord>(line_no, line)? {
                SummaryRecord::Header(header) => {
                    if only_level.is_none() {
                        overview.headers.push(header.into_header());
                    }
                }
                SummaryRecord::ParentFile { name } => {
                    if let (None, Some(header)) = (only_level, overview.headers.last_mut()) {
                        header.file_name = Some(name);
                    }
                }
                SummaryRecord::Scan(record) => {
                    let scan = record.into_scan();
                    if scan.ms_level > 1 && !msn.is_enabled() {
                        return Ok(());
                    }
                    if let Some(header) = overview.headers.last_mut() {
                        header.observe(&scan);
                    }
                    overview.observe(scan.ms_level, scan.polarity, overview_range(&scan, msn));
                }
            }
            Ok(())
        })
    }

    /// Number of scan records in the file.
    pub(crate) fn count_headers(&self) -> Result<usize, SourceError> {
        let mut count = 0;
        for_each_line(&self.path, |line_no, line| {
            if let SummaryRecord::Header(_) = parse::<SummaryRecord>(line_no, line)? {
                count += 1;
            }
            Ok(())
        })?;
        Ok(count)
    }

    pub(crate) fn count_scans(&self) -> Result<usize, SourceError> {
        let mut count = 0;
        for_each_line(&self.path, |line_no, line| {
            if let SummaryRecord::Scan(_) = parse::<SummaryRecord>(line_no, line)? {
                count += 1;
            }
            Ok(())
        })?;
        Ok(count)
    }
}

impl ScanSource for NdjsonScanSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_bytes(&self) -> u64 {
        self.size
    }

    fn overview(&mut self, msn: MsnMode) -> Result<Overview, SourceError> {
        let mut overview = Overview::default();
        self.overview_into(msn, None, &mut overview)?;
        Ok(overview)
    }

    fn read(&mut self, sink: &mut dyn ScanSink) -> Result<(), SourceError> {
        self.read_into(sink, None)
    }
}

/// Writes scans in the NDJSON interchange format.
pub struct NdjsonWriter<W: Write> {
    inner: W,
}

impl NdjsonWriter<BufWriter<File>> {
    /// Create (truncate) a file.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> NdjsonWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    fn write_record(&mut self, record: &Record) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.inner, record)?;
        self.inner.write_all(b"\n")
    }

    /// Announce a logical source file.
    pub fn write_header(&mut self, header: &ScanHeader) -> std::io::Result<()> {
        self.write_record(&Record::Header(HeaderRecord {
            scan_count: header.scan_count,
            file_name: header.file_name.clone(),
        }))
    }

    /// Name the current logical source file.
    pub fn write_parent_file(&mut self, name: &str) -> std::io::Result<()> {
        self.write_record(&Record::ParentFile {
            name: name.to_string(),
        })
    }

    /// Write a scan followed by its nested children.
    pub fn write_scan(&mut self, scan: &Scan) -> std::io::Result<()> {
        self.write_record(&Record::Scan(ScanRecord::from_scan(scan)))?;
        for child in &scan.children {
            self.write_scan(child)?;
        }
        Ok(())
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryScanSource;

    struct Collect {
        headers: Vec<ScanHeader>,
        scans: Vec<Scan>,
        names: Vec<String>,
        lower: f64,
        upper: f64,
    }

    impl Collect {
        fn new(lower: f64, upper: f64) -> Self {
            Self {
                headers: Vec::new(),
                scans: Vec::new(),
                names: Vec::new(),
                lower,
                upper,
            }
        }
    }

    impl ScanSink for Collect {
        fn add_header(&mut self, header: ScanHeader) -> Result<(), crate::source::SinkError> {
            self.headers.push(header);
            Ok(())
        }
        fn add_scan(&mut self, scan: Scan) -> Result<(), crate::source::SinkError> {
            self.scans.push(scan);
            Ok(())
        }
        fn last_base_scan(&self) -> Option<&Scan> {
            None
        }
        fn add_parent_file_name(&mut self, name: &str) -> Result<(), crate::source::SinkError> {
            self.names.push(name.to_string());
            Ok(())
        }
        fn lower_threshold(&self) -> f64 {
            self.lower
        }
        fn upper_threshold(&self) -> f64 {
            self.upper
        }
    }

    fn write_file(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("run.jsonl");
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const SAMPLE: &str = concat!(
        r#"{"type":"header","scan_count":2}"#,
        "\n",
        r#"{"type":"parent_file","name":"sample_a"}"#,
        "\n\n",
        r#"{"type":"scan","num":0,"ms_level":1,"rt":1.5,"polarity":"+","mz":[402.0,400.0,409.0],"intensity":[2.0,1.0,3.0]}"#,
        "\n",
        r#"{"type":"scan","num":1,"ms_level":2,"rt":1.6,"precursor_mz":402.0,"low_mz":50.0,"high_mz":450.0,"mz":[120.0],"intensity":[7.0]}"#,
        "\n",
    );

    #[test]
    fn test_read_windows_peaks_and_keeps_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = NdjsonScanSource::open(write_file(dir.path(), SAMPLE)).unwrap();
        assert_eq!(source.name(), "run");

        let mut sink = Collect::new(401.0, 410.0);
        source.read(&mut sink).unwrap();
        assert_eq!(sink.headers[0].scan_count, 2);
        assert_eq!(sink.names, vec!["sample_a".to_string()]);

        let ms1 = &sink.scans[0];
        assert_eq!(ms1.polarity, Polarity::Positive);
        assert_eq!(ms1.peaks.mz, vec![402.0, 409.0]);
        assert_eq!(ms1.total_ion_current, 6.0);
        assert_eq!((ms1.low_mz, ms1.high_mz), (400.0, 409.0));

        let ms2 = &sink.scans[1];
        assert_eq!(ms2.ms_level, 2);
        assert_eq!(ms2.precursor_mz, Some(402.0));
        assert!(ms2.peaks.is_empty());
    }

    #[test]
    fn test_overview_reads_extents_without_peaks() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = NdjsonScanSource::open(write_file(dir.path(), SAMPLE)).unwrap();

        let full = source.overview(MsnMode::Full).unwrap();
        assert_eq!((full.lowest_mz, full.highest_mz), (50.0, 450.0));
        assert_eq!(full.highest_ms_level, 2);
        assert_eq!(full.headers[0].file_name.as_deref(), Some("sample_a"));

        let ms1_only = source.overview(MsnMode::Off).unwrap();
        assert_eq!((ms1_only.lowest_mz, ms1_only.highest_mz), (400.0, 409.0));
        assert_eq!(ms1_only.highest_ms_level, 1);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            concat!(
                r#"{"type":"header","scan_count":1}"#,
                "\n",
                r#"{"type":"scan","num":0,"ms_level":1,"rt":1.0,"mz":[1.0,2.0],"intensity":[1.0]}"#,
                "\n"
            ),
        );
        let mut source = NdjsonScanSource::open(path).unwrap();
        let mut sink = Collect::new(f64::NEG_INFINITY, f64::INFINITY);
        match source.read(&mut sink) {
            Err(SourceError::InvalidRecord { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }

        let path = write_file(dir.path(), "{\"type\":\"scan\",\"num\":0}\n");
        let mut source = NdjsonScanSource::open(path).unwrap();
        assert!(matches!(
            source.read(&mut sink),
            Err(SourceError::JsonError { line: 1, .. })
        ));
    }

    #[test]
    fn test_scan_before_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "{\"type\":\"scan\",\"num\":0,\"ms_level\":1,\"rt\":1.0}\n",
        );
        let mut source = NdjsonScanSource::open(path).unwrap();
        let mut sink = Collect::new(f64::NEG_INFINITY, f64::INFINITY);
        assert!(matches!(
            source.read(&mut sink),
            Err(SourceError::InvalidRecord { line: 1, .. })
        ));
    }

    #[test]
    fn test_writer_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("written.jsonl");
        let mut base = Scan::new_ms1(
            0,
            3.0,
            Polarity::Negative,
            PeakArrays::new(vec![300.0, 301.0], vec![4.0, 5.0]),
        );
        base.children.push(Scan::new_msn(
            1,
            2,
            3.1,
            Polarity::Negative,
            300.0,
            PeakArrays::new(vec![80.0], vec![1.0]),
        ));

        let mut writer = NdjsonWriter::create(&path).unwrap();
        writer.write_header(&ScanHeader::new(2).with_file_name("neg")).unwrap();
        writer.write_scan(&base).unwrap();
        writer.finish().unwrap();

        let mut from_file = NdjsonScanSource::open(&path).unwrap();
        let mut from_memory = MemoryScanSource::new("mem");
        from_memory.push_run(ScanHeader::new(2).with_file_name("neg"), vec![base]);
        let a = from_file.overview(MsnMode::Full).unwrap();
        let b = from_memory.overview(MsnMode::Full).unwrap();
        assert_eq!(a.headers, b.headers);
        assert_eq!((a.lowest_mz, a.highest_mz), (b.lowest_mz, b.highest_mz));
    }
}
