use std::path::Path;

use super::*;
use crate::codec::{decode_line, read_index_file, read_retention_time_file, LineEntry};
use crate::scan::{MsnMode, PeakArrays, Polarity, Scan};
use crate::scan::Overview;
use crate::shard::ShardError;
use crate::source::{MemoryScanSource, ScanSink, ScanSource, SinkError, SourceError};

fn config(threads: usize) -> TranslatorConfig {
    TranslatorConfig::default()
        .with_threads(threads)
        .with_resolution(1000, 0.01)
        .with_msn(MsnMode::Off)
}

fn ms1(num: i32, rt: f32, mz: &[f64]) -> Scan {
    let intensity = mz.iter().map(|m| (*m as f32) / 100.0).collect();
    Scan::new_ms1(num, rt, Polarity::Positive, PeakArrays::new(mz.to_vec(), intensity))
        .with_range(400.0, 410.0)
}

fn ms2(num: i32, rt: f32, precursor: f64, mz: &[f64]) -> Scan {
    let intensity = mz.iter().map(|_| 3.0).collect();
    Scan::new_msn(
        num,
        2,
        rt,
        Polarity::Positive,
        precursor,
        PeakArrays::new(mz.to_vec(), intensity),
    )
}

/// Twenty MS1 scans with peaks spread over 400-410 and a fragment after every
/// other one.
fn run_scans() -> Vec<Scan> {
    let mut scans = Vec::new();
    let mut num = 1;
    for i in 0..20 {
        let mz: Vec<f64> = (0..15)
            .map(|k| 400.0 + ((i * 37 + k * 61) % 1000) as f64 * 0.01 + 0.002)
            .collect();
        let mut mz = mz;
        mz.sort_by(f64::total_cmp);
        scans.push(ms1(num, i as f32, &mz));
        num += 1;
        if i % 2 == 0 {
            let precursor = 401.0 + (i % 7) as f64;
            scans.push(ms2(num, i as f32 + 0.5, precursor, &[400.25, 403.5 + i as f64 * 0.1]));
            num += 1;
        }
    }
    scans
}

fn read_lines(path: &Path) -> Vec<Vec<LineEntry>> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| decode_line(l).unwrap())
        .collect()
}

fn assert_same_file(a: &Path, b: &Path) {
    let left = std::fs::read(a).unwrap();
    let right = std::fs::read(b).unwrap();
    assert!(left == right, "{} differs from {}", a.display(), b.display());
}

#[test]
fn test_three_scans_single_thread() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemoryScanSource::from_scans(
        "run",
        vec![
            ms1(1, 1.0, &[400.0, 405.001]),
            ms1(2, 2.0, &[405.004]),
            ms1(3, 3.0, &[409.999]),
        ],
    );

    let mut translator = Translator::new(config(1));
    let stats = translator.translate(&mut source, dir.path()).unwrap();
    assert_eq!(translator.state(), TranslationState::Done);
    assert!(stats.reused_overview);
    assert_eq!(stats.lines_per_level, 1000);
    assert_eq!(stats.ms1_scans, 3);
    assert_eq!(stats.sets_written, 1);

    let header = ChromHeader::read(dir.path().join("run.head")).unwrap();
    assert_eq!((header.mz_lowest, header.mz_highest), (400_000, 410_000));
    assert_eq!(header.line_count(), 1000);
    assert_eq!(header.retention_times, vec![1.0, 2.0, 3.0]);
    assert_eq!(header.highest_ms_level, 1);

    let lines = read_lines(&dir.path().join("run.chrom"));
    assert_eq!(lines.len(), 1000);
    assert_eq!(lines[500].len(), 2);
    assert_eq!(read_index_file(dir.path().join("run.idx")).unwrap().len(), 2);

    // Only final artifacts remain
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_two_threads_split_at_midpoint() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemoryScanSource::from_scans(
        "run",
        vec![ms1(1, 1.0, &[404.9996, 405.0]), ms1(2, 2.0, &[405.004])],
    );

    let stats = Translator::new(config(2))
        .translate(&mut source, dir.path())
        .unwrap();
    assert_eq!(stats.shards, 2);
    assert!(!stats.reused_overview);

    let lines = read_lines(&dir.path().join("run.chrom"));
    assert_eq!(lines.len(), 1000);
    // 404.9996 rounds up onto the first line of the second shard
    assert_eq!(lines[499], Vec::<LineEntry>::new());
    assert_eq!(lines[500].len(), 2);
    assert_eq!(lines[500][0].scan, 0);
    assert_eq!(lines[500][1].scan, 1);
}

#[test]
fn test_sharded_output_matches_single_thread() {
    for msn in [MsnMode::Full, MsnMode::Precursor] {
        let single = tempfile::tempdir().unwrap();
        let sharded = tempfile::tempdir().unwrap();

        let mut source = MemoryScanSource::from_scans("run", run_scans());
        let reference = Translator::new(config(1).with_msn(msn).with_index_stride(7))
            .translate(&mut source, single.path())
            .unwrap();

        let mut source = MemoryScanSource::from_scans("run", run_scans()).with_size_bytes(300);
        let stats = Translator::new(
            config(3)
                .with_msn(msn)
                .with_index_stride(7)
                .with_max_bytes_per_iteration(100)
                .with_batch_bins(5),
        )
        .translate(&mut source, sharded.path())
        .unwrap();
        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.shards, 9);
        assert_eq!(stats.msn_scans, reference.msn_scans);

        for name in ["run.chrom", "run.idx", "run.chrom2", "run.idx2", "run.rtt2"] {
            assert_same_file(&single.path().join(name), &sharded.path().join(name));
        }

        let mut left = ChromHeader::read(single.path().join("run.head")).unwrap();
        let mut right = ChromHeader::read(sharded.path().join("run.head")).unwrap();
        left.created = None;
        right.created = None;
        assert_eq!(left, right);
    }
}

#[test]
fn test_fragments_in_header_and_rtt() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemoryScanSource::from_scans(
        "run",
        vec![
            ms1(1, 1.0, &[401.0]),
            ms2(2, 1.1, 402.5, &[400.5]),
            ms2(3, 1.2, 401.5, &[400.5]),
            ms1(4, 2.0, &[401.0]),
            ms2(5, 2.1, 402.5, &[400.5]),
        ],
    );

    Translator::new(config(2).with_msn(MsnMode::Full))
        .translate(&mut source, dir.path())
        .unwrap();

    let header = ChromHeader::read(dir.path().join("run.head")).unwrap();
    assert_eq!(header.highest_ms_level, 2);
    let level = header.msn_level(2).unwrap();
    assert_eq!(level.scan_count, 3);
    assert_eq!(
        level.precursors,
        vec![
            ("401.5".to_string(), vec![3]),
            ("402.5".to_string(), vec![2, 5])
        ]
    );

    let rtt = read_retention_time_file(dir.path().join(&level.rtt_file)).unwrap();
    let scans: Vec<i32> = rtt.iter().map(|e| e.scan).collect();
    assert_eq!(scans, vec![2, 3, 5]);
}

#[test]
fn test_polarity_switching_writes_two_sets() {
    let dir = tempfile::tempdir().unwrap();
    let mut negative = ms1(2, 2.0, &[402.0]);
    negative.polarity = Polarity::Negative;
    let mut source = MemoryScanSource::from_scans(
        "run",
        vec![ms1(1, 1.0, &[401.0]), negative, ms1(3, 3.0, &[403.0])],
    );

    let stats = Translator::new(config(2))
        .translate(&mut source, dir.path())
        .unwrap();
    assert!(stats.polarity_switching);
    assert_eq!(stats.sets_written, 2);

    let positive = ChromHeader::read(dir.path().join("run_positive.head")).unwrap();
    assert_eq!(positive.polarity, Polarity::Positive);
    assert_eq!(positive.retention_times, vec![1.0, 3.0]);
    let negative = ChromHeader::read(dir.path().join("run_negative.head")).unwrap();
    assert_eq!(negative.retention_times, vec![2.0]);
    assert!(negative.polarity_switched);
}

#[test]
fn test_overflow_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemoryScanSource::new("run");
    source.push_run(
        crate::scan::ScanHeader::new(1),
        vec![ms1(1, 1.0, &[401.0]), ms1(2, 2.0, &[402.0])],
    );

    let mut translator = Translator::new(config(2));
    let err = translator.translate(&mut source, dir.path()).unwrap_err();
    assert!(matches!(
        err,
        TranslationError::SourceError(SourceError::SinkError(SinkError::BufferOverflow { .. }))
    ));
    assert_eq!(translator.state(), TranslationState::Failed);
}

#[test]
fn test_precursor_outside_grid_is_dropped() {
    for threads in [1, 2] {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemoryScanSource::from_scans(
            "run",
            vec![
                ms1(1, 1.0, &[401.0, 409.0]),
                ms2(2, 1.1, 405.0, &[300.0]),
                ms2(3, 1.2, 800.0, &[300.0]),
            ],
        );

        let stats = Translator::new(config(threads).with_msn(MsnMode::Precursor))
            .translate(&mut source, dir.path())
            .unwrap();
        assert_eq!(stats.msn_scans, 1, "threads={threads}");

        let header = ChromHeader::read(dir.path().join("run.head")).unwrap();
        let level = header.msn_level(2).unwrap();
        assert_eq!(level.precursors, vec![("405".to_string(), vec![2])]);
    }
}

#[test]
fn test_fragment_without_base_scan_is_fatal() {
    for threads in [1, 2] {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemoryScanSource::from_scans(
            "run",
            vec![ms2(1, 0.5, 405.0, &[400.5]), ms1(2, 1.0, &[401.0])],
        );

        let mut translator = Translator::new(config(threads).with_msn(MsnMode::Full));
        let err = translator.translate(&mut source, dir.path()).unwrap_err();
        assert!(
            matches!(
                err,
                TranslationError::SourceError(SourceError::SinkError(SinkError::NoBaseScan {
                    scan: 1,
                    ms_level: 2
                }))
            ),
            "threads={threads}: {err:?}"
        );
        assert_eq!(translator.state(), TranslationState::Failed);
        assert!(!dir.path().join("run.head").exists());
    }
}

/// Raises the abort flag once its scans have been handed over.
struct AbortAfterRead {
    inner: MemoryScanSource,
    abort: Arc<AtomicBool>,
}

impl ScanSource for AbortAfterRead {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn size_bytes(&self) -> u64 {
        self.inner.size_bytes()
    }

    fn overview(&mut self, msn: MsnMode) -> Result<Overview, SourceError> {
        self.inner.overview(msn)
    }

    fn read(&mut self, sink: &mut dyn ScanSink) -> Result<(), SourceError> {
        self.inner.read(sink)?;
        self.abort.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_abort_during_run_fails_the_translation() {
    for threads in [1, 2] {
        let dir = tempfile::tempdir().unwrap();
        let mut translator = Translator::new(config(threads));
        let mut source = AbortAfterRead {
            inner: MemoryScanSource::from_scans("run", run_scans()),
            abort: translator.abort_handle(),
        };

        let err = translator.translate(&mut source, dir.path()).unwrap_err();
        assert!(
            matches!(
                err,
                TranslationError::ShardError {
                    source: ShardError::Aborted,
                    ..
                }
            ),
            "threads={threads}: {err:?}"
        );
        assert_eq!(translator.state(), TranslationState::Failed);
        assert!(!dir.path().join("run.head").exists());
        assert!(!translator.abort_handle().load(Ordering::SeqCst));
    }
}

#[test]
fn test_abort_raised_before_run_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let mut translator = Translator::new(config(2));
    translator.abort_handle().store(true, Ordering::SeqCst);

    let mut source = MemoryScanSource::from_scans("run", run_scans());
    let err = translator.translate(&mut source, dir.path()).unwrap_err();
    assert!(matches!(
        err,
        TranslationError::ShardError {
            source: ShardError::Aborted,
            ..
        }
    ));

    // The flag was cleared with the failed run, so the next one completes
    let mut source = MemoryScanSource::from_scans("run", run_scans());
    translator.translate(&mut source, dir.path()).unwrap();
    assert_eq!(translator.state(), TranslationState::Done);
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = MemoryScanSource::from_scans("run", vec![ms1(1, 1.0, &[401.0])]);
    let err = Translator::new(config(0))
        .translate(&mut source, dir.path())
        .unwrap_err();
    assert!(matches!(err, TranslationError::InvalidConfig(_)));
}

#[test]
fn test_file_without_peaks_gets_empty_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let empty = Scan::new_ms1(1, 1.0, Polarity::Positive, PeakArrays::default());
    let mut source = MemoryScanSource::from_scans("run", vec![empty]);

    let stats = Translator::new(config(2))
        .translate(&mut source, dir.path())
        .unwrap();
    assert_eq!(stats.lines_per_level, 0);
    assert_eq!(stats.sets_written, 1);

    let header = ChromHeader::read(dir.path().join("run.head")).unwrap();
    assert_eq!(header.scan_count, 1);
    assert_eq!(std::fs::read(dir.path().join("run.chrom")).unwrap().len(), 0);
}

#[test]
fn test_group_precursors() {
    let info = |scan, mz| MsnScanInfo {
        scan,
        retention_time: 0.0,
        precursor_mz: mz,
    };
    let groups = group_precursors(&[
        info(7, Some(500.25)),
        info(2, Some(500.25)),
        info(4, Some(300.0)),
        info(9, None),
    ]);
    assert_eq!(
        groups,
        vec![("300".to_string(), vec![4]), ("500.25".to_string(), vec![2, 7])]
    );
}
