use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mzchrom::scan::{PeakArrays, Polarity, Scan, ScanHeader};
use mzchrom::source::NdjsonWriter;

/// Seconds between MS1 survey scans.
const CYCLE_TIME: f32 = 1.5;

/// Lipid species: name, [M+H]+ m/z, [M-H]- m/z, apex RT (fraction of the run), head-group fragment.
const SPECIES: &[(&str, f64, f64, f32, f64)] = &[
    ("LPC 16:0", 496.3398, 494.3252, 0.15, 184.0733),
    ("PE 34:1", 718.5381, 716.5236, 0.45, 577.5190),
    ("PC 32:0", 734.5694, 732.5549, 0.50, 184.0733),
    ("PC 34:1", 760.5851, 758.5705, 0.55, 184.0733),
    ("PC 36:2", 786.6007, 784.5862, 0.58, 184.0733),
    ("SM 34:1", 703.5748, 701.5603, 0.48, 184.0733),
    ("TG 52:3", 874.7858, 872.7713, 0.85, 577.5190),
];

/// Generate a synthetic lipidomics run
pub fn run(output: PathBuf, duration: f32, polarity_switching: bool) -> Result<()> {
    if duration.is_nan() || duration <= 0.0 {
        anyhow::bail!("Run duration must be positive, got {duration}");
    }

    info!("mzChrom Demo - synthetic lipidomics run");
    info!("========================================");

    let scans = generate_lipid_run(duration, polarity_switching);
    let total: usize = scans.iter().map(|s| 1 + s.children.len()).sum();
    let name = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "demo".to_string());

    info!("Creating NDJSON file: {}", output.display());
    let mut writer = NdjsonWriter::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    writer
        .write_header(&ScanHeader::new(total).with_file_name(name))
        .context("Failed to write header record")?;
    for scan in &scans {
        writer.write_scan(scan).context("Failed to write scan record")?;
    }
    writer.finish().context("Failed to flush output")?;

    info!("  MS1 scans: {}", scans.len());
    info!("  MS2 scans: {}", total - scans.len());
    println!(
        "Wrote {} scans to {} (translate with: mzchrom translate {})",
        total,
        output.display(),
        output.display()
    );
    Ok(())
}

/// MS1 survey scans with their DDA fragment scans attached as children.
fn generate_lipid_run(duration: f32, polarity_switching: bool) -> Vec<Scan> {
    let mut scans = Vec::new();
    let mut ms2_num = 0;
    let mut rt = 0.0f32;
    let mut num = 0;

    while rt < duration {
        let polarity = if polarity_switching && num % 2 == 1 {
            Polarity::Negative
        } else {
            Polarity::Positive
        };
        let position = rt / duration;

        let mut survey = Scan::new_ms1(num, rt, polarity, ms1_peaks(position, polarity))
            .with_range(150.0, 1000.0);

        // Top-2 species currently eluting get fragmented
        let mut eluting: Vec<(f64, f32, f64)> = SPECIES
            .iter()
            .map(|&(_, pos, neg, apex, fragment)| {
                let mz = if polarity == Polarity::Negative { neg } else { pos };
                (mz, elution(position, apex), fragment)
            })
            .filter(|(_, abundance, _)| *abundance > 0.05)
            .collect();
        eluting.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (precursor, abundance, fragment) in eluting.into_iter().take(2) {
            let peaks = ms2_peaks(precursor, fragment, abundance);
            survey.children.push(
                Scan::new_msn(ms2_num, 2, rt + 0.1, polarity, precursor, peaks)
                    .with_range(100.0, precursor as f32 + 10.0),
            );
            ms2_num += 1;
        }

        scans.push(survey);
        num += 1;
        rt += CYCLE_TIME;
    }

    scans
}

/// Gaussian elution profile, 1.0 at the apex.
fn elution(position: f32, apex: f32) -> f32 {
    let width = 0.03;
    (-((position - apex) / width).powi(2) / 2.0).exp()
}

fn ms1_peaks(position: f32, polarity: Polarity) -> PeakArrays {
    let mut mz = Vec::new();
    let mut intensity = Vec::new();

    // Chemical background
    for i in 0..120 {
        let base = 200.0 + i as f64 * 6.5;
        mz.push(base + (i as f64 * 0.123).sin() * 0.01);
        intensity.push(1e3 * (0.1 + (i as f64 * 0.456).sin().abs() * 0.9) as f32);
    }

    for (i, &(_, pos, neg, apex, _)) in SPECIES.iter().enumerate() {
        let abundance = elution(position, apex);
        if abundance < 0.01 {
            continue;
        }
        let mono = if polarity == Polarity::Negative { neg } else { pos };
        let height = 1e6 * (1.0 + i as f32 * 0.25) * abundance;
        // M, M+1 and M+2 isotopes
        for (k, ratio) in [1.0f32, 0.45, 0.12].iter().enumerate() {
            mz.push(mono + k as f64 * 1.003355);
            intensity.push(height * ratio);
        }
    }

    let mut peaks = PeakArrays::new(mz, intensity);
    peaks.sort_by_mz();
    peaks
}

fn ms2_peaks(precursor: f64, fragment: f64, abundance: f32) -> PeakArrays {
    let mut mz = vec![fragment, precursor - 18.0106, precursor];
    let mut intensity = vec![5e5 * abundance, 8e4 * abundance, 2e4 * abundance];
    for i in 0..10 {
        mz.push(120.0 + i as f64 * ((precursor - 150.0) / 10.0));
        intensity.push(2e3 * (0.2 + (i as f64 * 0.321).sin().abs() as f32 * 0.8));
    }
    let mut peaks = PeakArrays::new(mz, intensity);
    peaks.sort_by_mz();
    peaks
}
