//! # Chromatogram Header
//!
//! The `.head` file is a small `key=value` property file describing everything
//! needed to open a chromatogram later: the integer m/z grid, bounds, index
//! stride, per-level file names (relative to the header's directory), scan
//! counts, MS1 retention times and the MSn precursor map.
//!
//! Lines starting with `#` are comments. Unknown keys are ignored on read.

mod error;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

pub use error::HeaderError;

use crate::scan::{MsnMode, Polarity};

/// Current `.head` format revision.
pub const FORMAT_VERSION: u32 = 1;

/// Files and scans of one MS level >= 2.
#[derive(Debug, Clone, PartialEq)]
pub struct MsnLevel {
    /// MS level
    pub level: u8,
    /// Data file name
    pub chrom_file: String,
    /// Index file name
    pub index_file: String,
    /// Retention-time file name
    pub rtt_file: String,
    /// Number of scans with a retention-time record
    pub scan_count: usize,
    /// Precursor m/z (as written) with the scan numbers fragmenting it,
    /// ascending by precursor
    pub precursors: Vec<(String, Vec<i32>)>,
}

/// Contents of a `.head` file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromHeader {
    /// Format revision
    pub version: u32,
    /// When the artifacts were written
    pub created: Option<DateTime<Utc>>,
    /// Logical source file the set was built from
    pub source_file: Option<String>,
    /// `round(mz * factor)` gives integer m/z
    pub multiplication_factor: i32,
    /// Bin width in m/z
    pub lowest_resolution: f32,
    /// First integer m/z (inclusive)
    pub mz_lowest: i64,
    /// Integer m/z bound (exclusive)
    pub mz_highest: i64,
    /// Lines per index window
    pub index_stride: u32,
    /// Number of MS1 scans
    pub scan_count: usize,
    /// Highest MS level with artifacts
    pub highest_ms_level: u8,
    /// Polarity of this set ([`Polarity::Unknown`] when the run does not switch)
    pub polarity: Polarity,
    /// Whether the run was split by polarity
    pub polarity_switched: bool,
    /// How MSn scans were written
    pub msn_mode: MsnMode,
    /// Earliest MS1 retention time
    pub start_rt: f32,
    /// Latest MS1 retention time
    pub end_rt: f32,
    /// Level 1 data file name
    pub chrom_file: String,
    /// Level 1 index file name
    pub index_file: String,
    /// Retention time per MS1 ordinal
    pub retention_times: Vec<f32>,
    /// Levels >= 2, ascending
    pub msn_levels: Vec<MsnLevel>,
}

impl ChromHeader {
    /// Number of data lines per level.
    pub fn line_count(&self) -> u64 {
        let step = (self.lowest_resolution as f64 * self.multiplication_factor as f64).round() as i64;
        if step <= 0 || self.mz_highest <= self.mz_lowest {
            0
        } else {
            ((self.mz_highest - self.mz_lowest) / step) as u64
        }
    }

    /// Level entry for `level >= 2`.
    pub fn msn_level(&self, level: u8) -> Option<&MsnLevel> {
        self.msn_levels.iter().find(|l| l.level == level)
    }

    /// Flatten into properties.
    pub fn to_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        let mut put = |key: &str, value: String| {
            props.insert(key.to_string(), value);
        };

        put("format_version", self.version.to_string());
        if let Some(created) = self.created {
            put("created", created.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        if let Some(source) = &self.source_file {
            put("source_file", source.clone());
        }
        put("multiplication_factor", self.multiplication_factor.to_string());
        put("lowest_resolution", self.lowest_resolution.to_string());
        put("mz_lowest", self.mz_lowest.to_string());
        put("mz_highest", self.mz_highest.to_string());
        put("index_stride", self.index_stride.to_string());
        put("scan_count", self.scan_count.to_string());
        put("highest_ms_level", self.highest_ms_level.to_string());
        put("polarity", self.polarity.as_str().to_string());
        put("polarity_switched", self.polarity_switched.to_string());
        if let Some(marker) = self.msn_mode.marker() {
            put("msn_type", marker.to_string());
        }
        put("start_rt", self.start_rt.to_string());
        put("end_rt", self.end_rt.to_string());
        put("chrom_file", self.chrom_file.clone());
        put("index_file", self.index_file.clone());
        put("retention_times", join(&self.retention_times));

        for level in &self.msn_levels {
            let n = level.level;
            put(&format!("chrom_file_{n}"), level.chrom_file.clone());
            put(&format!("index_file_{n}"), level.index_file.clone());
            put(&format!("rtt_file_{n}"), level.rtt_file.clone());
            put(&format!("scan_count_{n}"), level.scan_count.to_string());
            put(&format!("msn_precursors_{n}"), format_precursors(&level.precursors));
        }
        props
    }

    /// Rebuild from properties.
    pub fn from_properties(props: &BTreeMap<String, String>) -> Result<Self, HeaderError> {
        let version: u32 = required(props, "format_version")?;
        if version > FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let created = match props.get("created") {
            Some(value) => Some(
                DateTime::parse_from_rfc3339(value)
                    .map_err(|_| invalid("created", value))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        let polarity = match props.get("polarity") {
            Some(value) => Polarity::parse(value).ok_or_else(|| invalid("polarity", value))?,
            None => Polarity::Unknown,
        };
        let msn_mode = match props.get("msn_type") {
            Some(value) => MsnMode::from_marker(value).ok_or_else(|| invalid("msn_type", value))?,
            None => MsnMode::Off,
        };
        let highest_ms_level: u8 = required(props, "highest_ms_level")?;

        let mut msn_levels = Vec::new();
        if msn_mode.is_enabled() {
            for n in 2..=highest_ms_level {
                let precursors_key = format!("msn_precursors_{n}");
                let precursors = match props.get(&precursors_key) {
                    Some(value) => parse_precursors(&precursors_key, value)?,
                    None => Vec::new(),
                };
                msn_levels.push(MsnLevel {
                    level: n,
                    chrom_file: required_str(props, &format!("chrom_file_{n}"))?,
                    index_file: required_str(props, &format!("index_file_{n}"))?,
                    rtt_file: required_str(props, &format!("rtt_file_{n}"))?,
                    scan_count: required(props, &format!("scan_count_{n}"))?,
                    precursors,
                });
            }
        }

        Ok(Self {
            version,
            created,
            source_file: props.get("source_file").cloned(),
            multiplication_factor: required(props, "multiplication_factor")?,
            lowest_resolution: required(props, "lowest_resolution")?,
            mz_lowest: required(props, "mz_lowest")?,
            mz_highest: required(props, "mz_highest")?,
            index_stride: required(props, "index_stride")?,
            scan_count: required(props, "scan_count")?,
            highest_ms_level,
            polarity,
            polarity_switched: optional(props, "polarity_switched")?.unwrap_or(false),
            msn_mode,
            start_rt: optional(props, "start_rt")?.unwrap_or(0.0),
            end_rt: optional(props, "end_rt")?.unwrap_or(0.0),
            chrom_file: required_str(props, "chrom_file")?,
            index_file: required_str(props, "index_file")?,
            retention_times: split(props, "retention_times")?,
            msn_levels,
        })
    }

    /// Write to any sink.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "# mzchrom chromatogram header")?;
        if let Some(source) = &self.source_file {
            writeln!(writer, "# source: {source}")?;
        }
        for (key, value) in self.to_properties() {
            writeln!(writer, "{key}={value}")?;
        }
        Ok(())
    }

    /// Write to a file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()
    }

    /// Parse from any reader.
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, HeaderError> {
        let mut props = BTreeMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or_else(|| HeaderError::MalformedLine {
                line: index + 1,
                content: trimmed.to_string(),
            })?;
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self::from_properties(&props)
    }

    /// Read a `.head` file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, HeaderError> {
        Self::read_from(BufReader::new(File::open(path)?))
    }
}

fn invalid(key: &str, value: &str) -> HeaderError {
    HeaderError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn required_str(props: &BTreeMap<String, String>, key: &str) -> Result<String, HeaderError> {
    props
        .get(key)
        .cloned()
        .ok_or_else(|| HeaderError::MissingKey(key.to_string()))
}

fn required<T: FromStr>(props: &BTreeMap<String, String>, key: &str) -> Result<T, HeaderError> {
    optional(props, key)?.ok_or_else(|| HeaderError::MissingKey(key.to_string()))
}

fn optional<T: FromStr>(props: &BTreeMap<String, String>, key: &str) -> Result<Option<T>, HeaderError> {
    match props.get(key) {
        Some(value) => value.parse().map(Some).map_err(|_| invalid(key, value)),
        None => Ok(None),
    }
}

fn join(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split(props: &BTreeMap<String, String>, key: &str) -> Result<Vec<f32>, HeaderError> {
    let Some(value) = props.get(key) else {
        return Ok(Vec::new());
    };
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|v| v.trim().parse().map_err(|_| invalid(key, v)))
        .collect()
}

/// `mz:scan,scan;mz:scan`
fn format_precursors(precursors: &[(String, Vec<i32>)]) -> String {
    precursors
        .iter()
        .map(|(mz, scans)| {
            let scans: Vec<String> = scans.iter().map(|s| s.to_string()).collect();
            format!("{mz}:{}", scans.join(","))
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_precursors(key: &str, value: &str) -> Result<Vec<(String, Vec<i32>)>, HeaderError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(';')
        .map(|group| {
            let (mz, scans) = group.split_once(':').ok_or_else(|| invalid(key, group))?;
            let scans = scans
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().map_err(|_| invalid(key, s)))
                .collect::<Result<Vec<i32>, _>>()?;
            Ok((mz.to_string(), scans))
        })
        .collect()
}
