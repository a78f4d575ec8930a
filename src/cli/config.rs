//! TOML configuration file support for power users.
//!
//! Instead of passing many CLI flags, users can specify settings in a config file:
//!
//! ```toml
//! # mzchrom.toml
//! [translation]
//! threads = 8
//! max_mb_per_iteration = 2048
//! multiplication_factor = 100000
//! lowest_resolution = 0.0001
//! msn = "precursor"
//! index_stride = 1000
//! batch_bins = 256
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use mzchrom::scan::MsnMode;
use mzchrom::translator::TranslatorConfig;

/// Root configuration structure for mzchrom.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Translation-specific settings.
    #[serde(default)]
    pub translation: TranslationConfig,
}

/// Configuration for the translate command.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationConfig {
    /// Worker threads per iteration.
    pub threads: Option<usize>,

    /// Input megabytes per memory iteration.
    pub max_mb_per_iteration: Option<u64>,

    /// Integer m/z multiplication factor.
    pub multiplication_factor: Option<i32>,

    /// m/z width of one data line.
    pub lowest_resolution: Option<f32>,

    /// MSn handling (`off`, `full`, `precursor`).
    pub msn: Option<MsnMode>,

    /// Lines per index window.
    pub index_stride: Option<u32>,

    /// Bins per batch-fill block.
    pub batch_bins: Option<usize>,

    /// Artifact stem for unnamed files.
    pub stem: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

impl TranslationConfig {
    /// Overlay the values that are set onto `config`.
    pub fn apply(&self, mut config: TranslatorConfig) -> TranslatorConfig {
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(mb) = self.max_mb_per_iteration {
            config = config.with_max_mb_per_iteration(mb);
        }
        if let Some(factor) = self.multiplication_factor {
            config.multiplication_factor = factor;
        }
        if let Some(resolution) = self.lowest_resolution {
            config.lowest_resolution = resolution;
        }
        if let Some(msn) = self.msn {
            config = config.with_msn(msn);
        }
        if let Some(stride) = self.index_stride {
            config = config.with_index_stride(stride);
        }
        if let Some(bins) = self.batch_bins {
            config = config.with_batch_bins(bins);
        }
        if let Some(stem) = &self.stem {
            config = config.with_stem(stem.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [translation]
            threads = 8
            max_mb_per_iteration = 2048
            multiplication_factor = 100000
            lowest_resolution = 0.0001
            msn = "precursor"
            index_stride = 500
            batch_bins = 64
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.translation.threads, Some(8));
        assert_eq!(config.translation.msn, Some(MsnMode::Precursor));

        let applied = config.translation.apply(TranslatorConfig::default());
        assert_eq!(applied.threads, 8);
        assert_eq!(applied.max_bytes_per_iteration, 2048 * 1024 * 1024);
        assert_eq!(applied.multiplication_factor, 100_000);
        assert_eq!(applied.index_stride, 500);
        assert_eq!(applied.batch_bins, 64);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [translation]
            threads = 3
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.translation.threads, Some(3));
        assert_eq!(config.translation.msn, None);
        let applied = config.translation.apply(TranslatorConfig::low_memory());
        assert_eq!(applied.batch_bins, TranslatorConfig::low_memory().batch_bins);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.translation.threads, None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_str("[translation]\ncompression_level = 3\n").is_err());
    }
}
