use super::types::{Polarity, Scan};

/// Aggregate description of one logical source file.
///
/// Created when the scan source announces the file, then updated as scans
/// arrive. An instrument file may multiplex several logical runs, each with its
/// own header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanHeader {
    /// Name of the logical source file, if known
    pub file_name: Option<String>,
    /// Declared number of scans (all MS levels)
    pub scan_count: usize,
    /// Retention time of the first scan (seconds)
    pub start_rt: f32,
    /// Retention time of the last scan (seconds)
    pub end_rt: f32,
    /// Highest MS level observed
    pub highest_ms_level: u8,
    /// Whether any MS1 scans were observed
    pub has_ms1: bool,
}

impl ScanHeader {
    /// Header declaring `scan_count` scans.
    pub fn new(scan_count: usize) -> Self {
        Self {
            scan_count,
            ..Default::default()
        }
    }

    /// Attach the logical file name (builder style).
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Fold one scan into the aggregate.
    pub fn observe(&mut self, scan: &Scan) {
        if !self.has_ms1 && self.highest_ms_level == 0 {
            self.start_rt = scan.retention_time;
        }
        self.start_rt = self.start_rt.min(scan.retention_time);
        self.end_rt = self.end_rt.max(scan.retention_time);
        self.highest_ms_level = self.highest_ms_level.max(scan.ms_level);
        if scan.ms_level == 1 {
            self.has_ms1 = true;
        }
    }
}

/// Result of the cheap first pass over a source.
#[derive(Debug, Clone)]
pub struct Overview {
    /// Lowest m/z of any routed scan
    pub lowest_mz: f64,
    /// Highest m/z of any routed scan
    pub highest_mz: f64,
    /// Highest MS level present
    pub highest_ms_level: u8,
    /// One header per logical source file
    pub headers: Vec<ScanHeader>,
    seen_positive: bool,
    seen_negative: bool,
}

impl Default for Overview {
    fn default() -> Self {
        Self {
            lowest_mz: f64::INFINITY,
            highest_mz: f64::NEG_INFINITY,
            highest_ms_level: 0,
            headers: Vec::new(),
            seen_positive: false,
            seen_negative: false,
        }
    }
}

impl Overview {
    /// Record a scan's attributes. `range` is `None` when the scan should not
    /// widen the m/z bounds (e.g. MSn scans in precursor mode).
    pub fn observe(&mut self, ms_level: u8, polarity: Polarity, range: Option<(f64, f64)>) {
        self.highest_ms_level = self.highest_ms_level.max(ms_level);
        match polarity {
            Polarity::Positive => self.seen_positive = true,
            Polarity::Negative => self.seen_negative = true,
            Polarity::Unknown => {}
        }
        if let Some((lo, hi)) = range {
            self.lowest_mz = self.lowest_mz.min(lo);
            self.highest_mz = self.highest_mz.max(hi);
        }
    }

    /// Whether positive and negative scans are interleaved in the source.
    pub fn polarity_switching(&self) -> bool {
        self.seen_positive && self.seen_negative
    }

    /// True when no scan contributed m/z bounds.
    pub fn is_empty(&self) -> bool {
        !(self.highest_mz >= self.lowest_mz)
    }

    /// Total scans declared across all logical files.
    pub fn scan_count(&self) -> usize {
        self.headers.iter().map(|h| h.scan_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::PeakArrays;

    #[test]
    fn test_header_tracks_rt_and_levels() {
        let mut header = ScanHeader::new(2).with_file_name("run");
        let ms1 = Scan::new_ms1(0, 5.0, Polarity::Positive, PeakArrays::default());
        let ms2 = Scan::new_msn(1, 2, 7.5, Polarity::Positive, 500.0, PeakArrays::default());
        header.observe(&ms1);
        header.observe(&ms2);
        assert_eq!(header.start_rt, 5.0);
        assert_eq!(header.end_rt, 7.5);
        assert_eq!(header.highest_ms_level, 2);
        assert!(header.has_ms1);
    }

    #[test]
    fn test_overview_polarity_switching() {
        let mut overview = Overview::default();
        assert!(overview.is_empty());
        overview.observe(1, Polarity::Positive, Some((400.0, 410.0)));
        assert!(!overview.polarity_switching());
        overview.observe(1, Polarity::Negative, Some((390.0, 405.0)));
        assert!(overview.polarity_switching());
        assert_eq!(overview.lowest_mz, 390.0);
        assert_eq!(overview.highest_mz, 410.0);
    }
}
