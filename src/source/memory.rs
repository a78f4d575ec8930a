use super::error::SourceError;
use super::{overview_range, ScanSink, ScanSource};
use crate::scan::{MsnMode, Overview, Scan, ScanHeader};

/// Approximate on-disk cost of one peak, used to size iterations.
const BYTES_PER_PEAK: u64 = 12;
/// Approximate per-scan overhead.
const BYTES_PER_SCAN: u64 = 64;

/// One logical source file held in memory.
#[derive(Debug, Clone)]
struct Run {
    header: ScanHeader,
    scans: Vec<Scan>,
}

/// Scan source backed by in-memory scans.
///
/// Useful for embedding the translator behind another reader and for tests.
/// Scans may carry their fragmentation scans either flat (in stream order) or
/// nested under [`Scan::children`].
#[derive(Debug, Clone)]
pub struct MemoryScanSource {
    name: String,
    runs: Vec<Run>,
    size_override: Option<u64>,
}

impl MemoryScanSource {
    /// Empty source whose artifacts default to `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runs: Vec::new(),
            size_override: None,
        }
    }

    /// Single-run source; the header's scan count is derived from `scans`.
    pub fn from_scans(name: impl Into<String>, scans: Vec<Scan>) -> Self {
        let mut source = Self::new(name);
        source.push_counted_run(None, scans);
        source
    }

    /// Add a logical source file with an explicit header.
    pub fn push_run(&mut self, header: ScanHeader, scans: Vec<Scan>) -> &mut Self {
        self.runs.push(Run { header, scans });
        self
    }

    /// Add a logical source file, declaring exactly as many scans as given.
    pub fn push_counted_run(&mut self, file_name: Option<String>, scans: Vec<Scan>) -> &mut Self {
        let count = scans.iter().map(count_with_children).sum();
        let mut header = ScanHeader::new(count);
        header.file_name = file_name;
        self.push_run(header, scans)
    }

    /// Pretend the input has this size (to exercise multi-iteration plans).
    pub fn with_size_bytes(mut self, size: u64) -> Self {
        self.size_override = Some(size);
        self
    }
}

fn count_with_children(scan: &Scan) -> usize {
    1 + scan.children.iter().map(count_with_children).sum::<usize>()
}

fn visit<'a>(scan: &'a Scan, f: &mut impl FnMut(&'a Scan)) {
    f(scan);
    for child in &scan.children {
        visit(child, f);
    }
}

impl ScanSource for MemoryScanSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size_bytes(&self) -> u64 {
        if let Some(size) = self.size_override {
            return size;
        }
        let mut total = 0u64;
        for run in &self.runs {
            for scan in &run.scans {
                visit(scan, &mut |s| {
                    total += BYTES_PER_SCAN + s.peak_count() as u64 * BYTES_PER_PEAK;
                });
            }
        }
        total
    }

    fn overview(&mut self, msn: MsnMode) -> Result<Overview, SourceError> {
        let mut overview = Overview::default();
        for run in &self.runs {
            let mut header = run.header.clone();
            for scan in &run.scans {
                visit(scan, &mut |s| {
                    if s.ms_level > 1 && !msn.is_enabled() {
                        return;
                    }
                    header.observe(s);
                    overview.observe(s.ms_level, s.polarity, overview_range(s, msn));
                });
            }
            overview.headers.push(header);
        }
        Ok(overview)
    }

    fn read(&mut self, sink: &mut dyn ScanSink) -> Result<(), SourceError> {
        for run in &self.runs {
            sink.add_header(run.header.clone())?;
            if let Some(name) = &run.header.file_name {
                sink.add_parent_file_name(name)?;
            }
            for scan in &run.scans {
                sink.add_scan(scan.clone())?;
            }
        }
        Ok(())
    }
}
