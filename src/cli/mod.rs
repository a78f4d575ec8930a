use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use mzchrom::scan::MsnMode;

mod config;
mod demo;
mod info;
mod profile;
mod translate;

pub use profile::Profile;
pub use translate::TranslateArgs;

/// mzChrom - translate mass spectrometry scans into seekable chromatograms
#[derive(Parser)]
#[command(name = "mzchrom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Translation profile trading memory for speed.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ProfileArg {
    /// Small iterations, two workers
    LowMemory,
    /// Defaults
    #[default]
    Balanced,
    /// Large iterations, every core
    Fast,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::LowMemory => Profile::LowMemory,
            ProfileArg::Balanced => Profile::Balanced,
            ProfileArg::Fast => Profile::Fast,
        }
    }
}

/// How fragmentation scans are written.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MsnArg {
    /// Ignore MSn scans
    Off,
    /// Bin fragment peaks
    Full,
    /// One total-ion-current entry at the precursor m/z
    Precursor,
}

impl From<MsnArg> for MsnMode {
    fn from(arg: MsnArg) -> Self {
        match arg {
            MsnArg::Off => MsnMode::Off,
            MsnArg::Full => MsnMode::Full,
            MsnArg::Precursor => MsnMode::Precursor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a scan file into chromatogram artifacts
    Translate {
        /// Input scan file (.ndjson/.jsonl); MSn siblings (<file>2, <file>3, ...) are picked up
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Translation profile (low-memory, balanced, fast)
        #[arg(short = 'p', long, default_value = "balanced", value_enum)]
        profile: ProfileArg,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Worker threads per iteration
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// Input megabytes handled per memory iteration
        #[arg(short = 'm', long)]
        max_mb: Option<u64>,

        /// MSn handling
        #[arg(long, value_enum)]
        msn: Option<MsnArg>,

        /// Artifact stem for unnamed files
        #[arg(long)]
        stem: Option<String>,

        // === Advanced tuning flags (hidden from --help) ===
        /// Integer m/z multiplication factor
        #[arg(long, hide = true)]
        multiplication_factor: Option<i32>,

        /// m/z width of one data line
        #[arg(long, hide = true)]
        resolution: Option<f32>,

        /// Lines per index window
        #[arg(long, hide = true)]
        index_stride: Option<u32>,

        /// Bins per batch-fill block
        #[arg(long, hide = true)]
        batch_bins: Option<usize>,
    },

    /// Generate a synthetic lipidomics run as NDJSON
    Demo {
        /// Output file path
        #[arg(value_name = "OUTPUT", default_value = "demo_lipid_run.ndjson")]
        output: PathBuf,

        /// Run length in seconds
        #[arg(long, default_value_t = 600.0)]
        duration: f32,

        /// Alternate positive and negative MS1 scans
        #[arg(long)]
        polarity_switching: bool,
    },

    /// Display information about a chromatogram header
    Info {
        /// Input .head file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Also print the extracted chromatogram of this m/z (+/- 0.01)
        #[arg(long)]
        mz: Option<f64>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Translate {
            input,
            output,
            profile,
            config,
            threads,
            max_mb,
            msn,
            stem,
            multiplication_factor,
            resolution,
            index_stride,
            batch_bins,
        } => translate::run(TranslateArgs {
            input,
            output,
            profile: Profile::from(profile),
            config,
            threads,
            max_mb,
            msn: msn.map(MsnMode::from),
            stem,
            multiplication_factor,
            resolution,
            index_stride,
            batch_bins,
        }),
        Commands::Demo {
            output,
            duration,
            polarity_switching,
        } => demo::run(output, duration, polarity_switching),
        Commands::Info { file, mz } => info::run(file, mz),
    }
}
