//! Translation profiles for common machines.
//!
//! Profiles pick iteration size, worker count and batch width so that users do
//! not have to reason about the memory model.

use std::fmt;
use std::str::FromStr;

use mzchrom::translator::TranslatorConfig;

/// Translation profiles for common use cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    /// Constrained memory.
    ///
    /// - 256 MiB of input per iteration
    /// - 2 workers
    /// - 32-bin batch blocks
    LowMemory,

    /// Default settings.
    ///
    /// - 1 GiB of input per iteration
    /// - one worker per core
    /// - 128-bin batch blocks
    #[default]
    Balanced,

    /// Throughput first.
    ///
    /// - 4 GiB of input per iteration
    /// - one worker per core
    /// - 512-bin batch blocks
    Fast,
}

impl Profile {
    /// Translator configuration for this profile.
    pub fn translator_config(&self) -> TranslatorConfig {
        match self {
            Profile::LowMemory => TranslatorConfig::low_memory(),
            Profile::Balanced => TranslatorConfig::balanced(),
            Profile::Fast => TranslatorConfig::fast(),
        }
    }

    /// Returns all available profile names.
    pub fn variants() -> &'static [&'static str] {
        &["low-memory", "balanced", "fast"]
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::LowMemory => write!(f, "low-memory"),
            Profile::Balanced => write!(f, "balanced"),
            Profile::Fast => write!(f, "fast"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low-memory" | "lowmemory" | "low" => Ok(Profile::LowMemory),
            "balanced" | "default" => Ok(Profile::Balanced),
            "fast" => Ok(Profile::Fast),
            _ => Err(format!(
                "Unknown profile '{}'. Valid options: {}",
                s,
                Profile::variants().join(", ")
            )),
        }
    }
}
