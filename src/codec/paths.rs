//! Artifact naming: `<stem>.chrom`, `<stem>.idx`, `<stem>.head` for level 1 and
//! `<stem>.chrom<N>`, `<stem>.idx<N>`, `<stem>.rtt<N>` for level N >= 2.

use std::path::{Path, PathBuf};

/// Data file extension
pub const CHROM_EXTENSION: &str = "chrom";
/// Index file extension
pub const INDEX_EXTENSION: &str = "idx";
/// Retention-time file extension
pub const RTT_EXTENSION: &str = "rtt";
/// Header file extension
pub const HEAD_EXTENSION: &str = "head";

/// Location of one artifact set (one source file, one polarity).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPaths {
    dir: PathBuf,
    stem: String,
}

fn level_suffix(level: u8) -> String {
    if level <= 1 {
        String::new()
    } else {
        level.to_string()
    }
}

impl ArtifactPaths {
    /// Artifacts named `<stem>.*` inside `dir`.
    pub fn new<P: AsRef<Path>>(dir: P, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            stem: stem.into(),
        }
    }

    /// Directory holding the artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Shared file stem.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Same stem, different directory.
    pub fn relocated<P: AsRef<Path>>(&self, dir: P) -> Self {
        Self::new(dir, self.stem.clone())
    }

    /// File name (without directory) of the data file for `level`.
    pub fn chrom_name(&self, level: u8) -> String {
        format!("{}.{}{}", self.stem, CHROM_EXTENSION, level_suffix(level))
    }

    /// File name of the index file for `level`.
    pub fn index_name(&self, level: u8) -> String {
        format!("{}.{}{}", self.stem, INDEX_EXTENSION, level_suffix(level))
    }

    /// File name of the retention-time file for `level`.
    pub fn rtt_name(&self, level: u8) -> String {
        format!("{}.{}{}", self.stem, RTT_EXTENSION, level_suffix(level))
    }

    /// File name of the header.
    pub fn head_name(&self) -> String {
        format!("{}.{}", self.stem, HEAD_EXTENSION)
    }

    /// Data file path.
    pub fn chrom(&self, level: u8) -> PathBuf {
        self.dir.join(self.chrom_name(level))
    }

    /// Index file path.
    pub fn index(&self, level: u8) -> PathBuf {
        self.dir.join(self.index_name(level))
    }

    /// Retention-time file path.
    pub fn rtt(&self, level: u8) -> PathBuf {
        self.dir.join(self.rtt_name(level))
    }

    /// Header path.
    pub fn head(&self) -> PathBuf {
        self.dir.join(self.head_name())
    }
}
