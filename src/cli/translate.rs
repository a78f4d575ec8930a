use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mzchrom::scan::MsnMode;
use mzchrom::translator::{TranslationStats, Translator, TranslatorConfig};

use super::config::Config;
use super::Profile;

/// Arguments of the translate command.
pub struct TranslateArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub profile: Profile,
    pub config: Option<PathBuf>,
    pub threads: Option<usize>,
    pub max_mb: Option<u64>,
    pub msn: Option<MsnMode>,
    pub stem: Option<String>,
    pub multiplication_factor: Option<i32>,
    pub resolution: Option<f32>,
    pub index_stride: Option<u32>,
    pub batch_bins: Option<usize>,
}

impl TranslateArgs {
    /// Profile, then config file, then explicit flags.
    fn resolve_config(&self) -> Result<TranslatorConfig> {
        let mut config = self.profile.translator_config();

        if let Some(path) = &self.config {
            info!("Loading configuration from {}", path.display());
            config = Config::from_file(path)?.translation.apply(config);
        }

        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(mb) = self.max_mb {
            config = config.with_max_mb_per_iteration(mb);
        }
        if let Some(msn) = self.msn {
            config = config.with_msn(msn);
        }
        if let Some(stem) = &self.stem {
            config = config.with_stem(stem.clone());
        }
        if let Some(factor) = self.multiplication_factor {
            config.multiplication_factor = factor;
        }
        if let Some(resolution) = self.resolution {
            config.lowest_resolution = resolution;
        }
        if let Some(stride) = self.index_stride {
            config = config.with_index_stride(stride);
        }
        if let Some(bins) = self.batch_bins {
            config = config.with_batch_bins(bins);
        }
        Ok(config)
    }
}

/// Translate a scan file into chromatogram artifacts
pub fn run(args: TranslateArgs) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let output = match &args.output {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let config = args.resolve_config()?;
    config.validate().context("Invalid translation settings")?;

    info!("mzChrom Translator");
    info!("==================");
    info!("Input:   {}", args.input.display());
    info!("Output:  {}", output.display());
    info!("Profile: {}", args.profile);
    info!("Threads: {}", config.threads);
    info!(
        "Iteration budget: {} MiB",
        config.max_bytes_per_iteration / (1024 * 1024)
    );
    info!(
        "Scale: x{} at {} m/z per line",
        config.multiplication_factor, config.lowest_resolution
    );
    info!("MSn: {}", config.msn.marker().unwrap_or("off"));

    let mut translator = Translator::new(config);
    let stats = translator
        .translate_file(&args.input, &output)
        .with_context(|| format!("Translation of {} failed", args.input.display()))?;

    print_stats(&stats);
    Ok(())
}

#[cfg(feature = "colorized_output")]
fn print_stats(stats: &TranslationStats) {
    use console::{style, Emoji};

    static DONE: Emoji<'_, '_> = Emoji("✓ ", "");

    println!("{}{}", DONE, style("Translation complete").green().bold());
    print_details(stats, |label| style(label).bold().to_string());
}

#[cfg(not(feature = "colorized_output"))]
fn print_stats(stats: &TranslationStats) {
    println!("Translation complete");
    print_details(stats, str::to_string);
}

fn print_details(stats: &TranslationStats, label: impl Fn(&str) -> String) {
    println!("  {}  {}", label("Sets:      "), stats.sets_written);
    println!(
        "  {}  {} MS1, {} MSn (up to MS{})",
        label("Scans:     "),
        stats.ms1_scans,
        stats.msn_scans,
        stats.highest_ms_level
    );
    println!("  {}  {}", label("Lines:     "), stats.lines_per_level);
    println!(
        "  {}  {} shard(s), {} iteration(s)",
        label("Work:      "),
        stats.shards,
        stats.iterations
    );
    println!("  {}  {} bytes", label("Written:   "), stats.bytes_written);
    println!("  {}  {:.2?}", label("Elapsed:   "), stats.elapsed);
    if stats.polarity_switching {
        println!("  {}  split by polarity", label("Polarity:  "));
    }
    for header in &stats.headers {
        println!("  {}  {}", label("Header:    "), header.display());
    }
}
