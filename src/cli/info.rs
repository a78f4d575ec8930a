use anyhow::{Context, Result};
use std::path::PathBuf;

use mzchrom::reader::ChromatogramReader;

/// Half width of the extraction window used by `--mz`.
const XIC_TOLERANCE: f64 = 0.01;

/// Display information about a chromatogram header
pub fn run(file: PathBuf, mz: Option<f64>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let reader = ChromatogramReader::open(&file)
        .with_context(|| format!("Failed to open artifact set {}", file.display()))?;
    let summary = reader.summary().context("Failed to summarize artifact set")?;

    print_title(&format!("mzChrom Artifact Set: {}", file.display()));
    print!("{summary}");

    for level in &reader.header().msn_levels {
        if level.precursors.is_empty() {
            continue;
        }
        println!();
        println!("MS{} precursors:", level.level);
        for (mz, scans) in &level.precursors {
            println!("  {:>12}  {} scan(s)", mz, scans.len());
        }
    }

    if let Some(mz) = mz {
        println!();
        for level in reader.levels() {
            let xic = reader
                .extract_chromatogram(level, mz - XIC_TOLERANCE, mz + XIC_TOLERANCE)
                .with_context(|| format!("Failed to extract MS{level} chromatogram"))?;
            print_title(&format!(
                "MS{level} chromatogram at m/z {mz} +/- {XIC_TOLERANCE}"
            ));
            match xic.apex() {
                Some((rt, intensity)) if intensity > 0.0 => {
                    println!("  Apex: {intensity:.1} at {rt:.2} s");
                }
                _ => println!("  No signal"),
            }
            for (rt, intensity) in xic.retention_times.iter().zip(&xic.intensities) {
                if *intensity > 0.0 {
                    println!("  {rt:>10.2}  {intensity:.1}");
                }
            }
        }
    }

    Ok(())
}

#[cfg(feature = "colorized_output")]
fn print_title(title: &str) {
    use console::style;
    println!("{}", style(title).bold().cyan());
    println!("{}", style("=".repeat(title.len())).cyan());
}

#[cfg(not(feature = "colorized_output"))]
fn print_title(title: &str) {
    println!("{title}");
    println!("{}", "=".repeat(title.len()));
}
