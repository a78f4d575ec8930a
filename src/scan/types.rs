use serde::{Deserialize, Serialize};

/// Ion polarity of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Positive ion mode
    #[serde(alias = "+")]
    Positive,
    /// Negative ion mode
    #[serde(alias = "-")]
    Negative,
    /// Polarity not reported by the instrument file
    #[default]
    #[serde(alias = "?")]
    Unknown,
}

impl Polarity {
    /// Interpret the signed convention used by most readers (1, -1, 0).
    pub fn from_sign(sign: i8) -> Self {
        match sign {
            s if s > 0 => Polarity::Positive,
            s if s < 0 => Polarity::Negative,
            _ => Polarity::Unknown,
        }
    }

    /// File-name suffix used when a run is split by polarity.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Polarity::Positive => "_positive",
            Polarity::Negative => "_negative",
            Polarity::Unknown => "",
        }
    }

    /// Header value for this polarity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Unknown => "unknown",
        }
    }

    /// Parse the header value written by [`Polarity::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "positive" | "+" => Some(Polarity::Positive),
            "negative" | "-" => Some(Polarity::Negative),
            "unknown" | "?" | "" => Some(Polarity::Unknown),
            _ => None,
        }
    }
}

/// How fragmentation (MS-level >= 2) scans are turned into chromatograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsnMode {
    /// MSn scans are ignored; only level 1 artifacts are written.
    Off,
    /// Fragment peaks are binned like MS1 peaks.
    #[default]
    Full,
    /// Each MSn scan contributes one entry (its total ion current) at the
    /// bin of its precursor m/z; scans are routed by precursor.
    Precursor,
}

impl MsnMode {
    /// Whether any MSn artifacts are produced.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MsnMode::Off)
    }

    /// Value of the `msn_type` header marker.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            MsnMode::Off => None,
            MsnMode::Full => Some("full"),
            MsnMode::Precursor => Some("precursor"),
        }
    }

    /// Parse an `msn_type` header marker.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "full" => Some(MsnMode::Full),
            "precursor" => Some(MsnMode::Precursor),
            "off" | "" => Some(MsnMode::Off),
            _ => None,
        }
    }
}

/// Peak list of a scan in structure-of-arrays layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakArrays {
    /// Mass-to-charge ratios, ascending once [`PeakArrays::sort_by_mz`] ran.
    pub mz: Vec<f64>,
    /// Peak intensities
    pub intensity: Vec<f32>,
}

impl PeakArrays {
    /// Create a new peak array set.
    pub fn new(mz: Vec<f64>, intensity: Vec<f32>) -> Self {
        Self { mz, intensity }
    }

    /// Returns the number of peaks.
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    /// Returns true if there are no peaks.
    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Validate that both arrays have matching lengths.
    pub fn validate(&self) -> Result<(), String> {
        if self.intensity.len() != self.mz.len() {
            return Err(format!(
                "intensity length {} does not match mz length {}",
                self.intensity.len(),
                self.mz.len()
            ));
        }
        Ok(())
    }

    /// True when m/z values are non-decreasing.
    pub fn is_sorted(&self) -> bool {
        self.mz.windows(2).all(|w| w[0] <= w[1])
    }

    /// Sort peaks by ascending m/z, keeping intensities paired.
    pub fn sort_by_mz(&mut self) {
        if self.is_sorted() {
            return;
        }
        let mut pairs: Vec<(f64, f32)> = self
            .mz
            .iter()
            .copied()
            .zip(self.intensity.iter().copied())
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (mz, intensity) = pairs.into_iter().unzip();
        self.mz = mz;
        self.intensity = intensity;
    }

    /// Copy of the peaks with `lower <= mz < upper`.
    pub fn window(&self, lower: f64, upper: f64) -> PeakArrays {
        let mut out = PeakArrays::default();
        for (&mz, &intensity) in self.mz.iter().zip(&self.intensity) {
            if mz >= lower && mz < upper {
                out.mz.push(mz);
                out.intensity.push(intensity);
            }
        }
        out
    }

    /// Smallest and largest m/z, if any peaks exist.
    pub fn extent(&self) -> Option<(f64, f64)> {
        let mut iter = self.mz.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// One spectrum as delivered by a scan source.
///
/// MS-level 1 scans own the fragmentation scans recorded after them in
/// [`Scan::children`]; the dispatcher attaches those via the sink's last base scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    /// Sequence number, increasing within an MS level of one source file
    pub num: i32,
    /// MS level (1, 2, ...)
    pub ms_level: u8,
    /// Retention time in seconds
    pub retention_time: f32,
    /// Lowest m/z of the acquisition range
    pub low_mz: f32,
    /// Highest m/z of the acquisition range
    pub high_mz: f32,
    /// Base peak m/z
    pub base_peak_mz: f32,
    /// Base peak intensity
    pub base_peak_intensity: f32,
    /// Total ion current
    pub total_ion_current: f32,
    /// Ion polarity
    pub polarity: Polarity,
    /// Precursor m/z (MS-level >= 2)
    pub precursor_mz: Option<f64>,
    /// Peak list
    pub peaks: PeakArrays,
    /// Fragmentation scans owned by this base scan
    pub children: Vec<Scan>,
}

impl Scan {
    /// Create an MS1 scan; statistics and acquisition range are derived from the peaks.
    pub fn new_ms1(num: i32, retention_time: f32, polarity: Polarity, peaks: PeakArrays) -> Self {
        let mut scan = Self {
            num,
            ms_level: 1,
            retention_time,
            low_mz: 0.0,
            high_mz: 0.0,
            base_peak_mz: 0.0,
            base_peak_intensity: 0.0,
            total_ion_current: 0.0,
            polarity,
            precursor_mz: None,
            peaks,
            children: Vec::new(),
        };
        scan.compute_statistics();
        scan.derive_range();
        scan
    }

    /// Create a fragmentation scan of the given level.
    pub fn new_msn(
        num: i32,
        ms_level: u8,
        retention_time: f32,
        polarity: Polarity,
        precursor_mz: f64,
        peaks: PeakArrays,
    ) -> Self {
        let mut scan = Self::new_ms1(num, retention_time, polarity, peaks);
        scan.ms_level = ms_level;
        scan.precursor_mz = Some(precursor_mz);
        scan
    }

    /// Override the acquisition range (builder style).
    pub fn with_range(mut self, low_mz: f32, high_mz: f32) -> Self {
        self.low_mz = low_mz;
        self.high_mz = high_mz;
        self
    }

    /// Calculate and set total ion current and base peak from the peak list.
    pub fn compute_statistics(&mut self) {
        if self.peaks.is_empty() {
            return;
        }

        let mut tic: f64 = 0.0;
        let mut max_intensity: f32 = 0.0;
        let mut max_mz: f64 = 0.0;

        for (mz, intensity) in self.peaks.mz.iter().zip(self.peaks.intensity.iter()) {
            tic += *intensity as f64;
            if *intensity > max_intensity {
                max_intensity = *intensity;
                max_mz = *mz;
            }
        }

        self.total_ion_current = tic as f32;
        self.base_peak_mz = max_mz as f32;
        self.base_peak_intensity = max_intensity;
    }

    fn derive_range(&mut self) {
        if let Some((lo, hi)) = self.peaks.extent() {
            self.low_mz = lo as f32;
            self.high_mz = hi as f32;
        }
    }

    /// Acquisition range, falling back to the peak extent when the source did
    /// not report one.
    pub fn mz_range(&self) -> Option<(f64, f64)> {
        if self.high_mz > 0.0 && self.high_mz >= self.low_mz {
            Some((self.low_mz as f64, self.high_mz as f64))
        } else {
            self.peaks.extent()
        }
    }

    /// Copy of this scan without children, keeping only peaks in `[lower, upper)`.
    pub fn restricted_to(&self, lower: f64, upper: f64) -> Scan {
        Scan {
            num: self.num,
            ms_level: self.ms_level,
            retention_time: self.retention_time,
            low_mz: self.low_mz,
            high_mz: self.high_mz,
            base_peak_mz: self.base_peak_mz,
            base_peak_intensity: self.base_peak_intensity,
            total_ion_current: self.total_ion_current,
            polarity: self.polarity,
            precursor_mz: self.precursor_mz,
            peaks: self.peaks.window(lower, upper),
            children: Vec::new(),
        }
    }

    /// Number of peaks in this scan.
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }
}
