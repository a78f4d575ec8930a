use std::path::Path;
use std::sync::atomic::AtomicBool;

use super::*;
use crate::codec::{
    decode_line, read_index_file, read_retention_time_file, LineEntry, ENTRIES_PER_INDEX,
};
use crate::scan::{PeakArrays, Polarity, Scan, ScanHeader};
use crate::source::{ScanSink, SinkError};

fn params(msn: MsnMode, highest: u8, switching: bool) -> ChromParams {
    ChromParams {
        scale: MzScale::new(1000, 0.01).unwrap(),
        msn,
        highest_ms_level: highest,
        polarity_switching: switching,
        index_stride: ENTRIES_PER_INDEX,
        batch_bins: 16,
        default_stem: "run".to_string(),
    }
}

fn spec(lower_mz: f64, upper_mz: f64) -> ShardSpec {
    let scale = MzScale::new(1000, 0.01).unwrap();
    ShardSpec::new(
        ShardId::new(0, 0),
        scale.lower_bound(lower_mz),
        scale.upper_bound(upper_mz),
        &scale,
        OVERLAP_TOLERANCE,
    )
}

fn ms1(num: i32, rt: f32, polarity: Polarity, mz: &[f64]) -> Scan {
    let intensity = mz.iter().map(|_| 10.0).collect();
    Scan::new_ms1(num, rt, polarity, PeakArrays::new(mz.to_vec(), intensity))
        .with_range(400.0, 410.0)
}

fn ms2(num: i32, rt: f32, precursor: f64, tic: f32) -> Scan {
    let mut scan = Scan::new_msn(
        num,
        2,
        rt,
        Polarity::Unknown,
        precursor,
        PeakArrays::new(vec![400.5], vec![tic]),
    );
    scan.total_ion_current = tic;
    scan
}

fn read_lines(path: &Path) -> Vec<Vec<LineEntry>> {
    let text = std::fs::read_to_string(path).unwrap();
    text.lines().map(|l| decode_line(l).unwrap()).collect()
}

fn feed(worker: &mut ShardWorker, scans: Vec<Scan>) {
    worker.add_header(ScanHeader::new(scans.len())).unwrap();
    for scan in scans {
        worker.add_scan(scan).unwrap();
    }
}

#[test]
fn test_three_scans_fill_one_thousand_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut worker = ShardWorker::new(spec(400.0, 410.0));
    feed(
        &mut worker,
        vec![
            ms1(10, 1.0, Polarity::Positive, &[400.0, 405.001]),
            ms1(11, 2.0, Polarity::Positive, &[405.004]),
            ms1(12, 3.0, Polarity::Positive, &[409.999]),
        ],
    );

    let output = worker
        .write_to_chrom(&params(MsnMode::Off, 1, false), dir.path(), &AtomicBool::new(false))
        .unwrap();
    let set = &output.sets[0];
    assert_eq!(set.level(1).unwrap().stats.lines, 1000);
    assert_eq!(set.summary.ms1_retention_times, vec![1.0, 2.0, 3.0]);

    let lines = read_lines(&set.paths.chrom(1));
    assert_eq!(lines.len(), 1000);
    // Scan ids are MS1 ordinals, not source scan numbers
    assert_eq!(lines[0], vec![LineEntry::new(0, 10.0)]);
    assert_eq!(lines[500], vec![LineEntry::new(0, 10.0), LineEntry::new(1, 10.0)]);
    assert_eq!(lines[999], vec![LineEntry::new(2, 10.0)]);
    assert_eq!(lines.iter().filter(|l| !l.is_empty()).count(), 3);

    let index = read_index_file(set.paths.index(1)).unwrap();
    assert_eq!(index.len(), 2);
}

#[test]
fn test_buffer_overflow_is_an_error() {
    let mut worker = ShardWorker::new(spec(400.0, 410.0));
    worker.add_header(ScanHeader::new(1).with_file_name("small")).unwrap();
    worker.add_scan(ms1(0, 1.0, Polarity::Positive, &[401.0])).unwrap();
    match worker.add_scan(ms1(1, 2.0, Polarity::Positive, &[401.0])) {
        Err(SinkError::BufferOverflow { file, capacity }) => {
            assert_eq!(file, "small");
            assert_eq!(capacity, 1);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
}

#[test]
fn test_scan_without_header_is_rejected() {
    let mut worker = ShardWorker::new(spec(400.0, 410.0));
    assert!(matches!(
        worker.add_scan(ms1(0, 1.0, Polarity::Positive, &[401.0])),
        Err(SinkError::NoHeader)
    ));
    assert!(worker.last_base_scan().is_none());
}

#[test]
fn test_msn_sorted_by_precursor_then_scan() {
    let dir = tempfile::tempdir().unwrap();
    let mut worker = ShardWorker::new(spec(400.0, 410.0));
    feed(
        &mut worker,
        vec![
            ms1(0, 1.0, Polarity::Positive, &[401.0]),
            ms2(9, 1.2, 402.0, 5.0),
            ms2(3, 1.1, 402.0, 6.0),
            ms2(5, 1.3, 401.0, 7.0),
        ],
    );
    assert_eq!(worker.last_base_scan().unwrap().children.len(), 3);

    let output = worker
        .write_to_chrom(&params(MsnMode::Full, 2, false), dir.path(), &AtomicBool::new(false))
        .unwrap();
    let set = &output.sets[0];
    let lines = read_lines(&set.paths.chrom(2));
    assert_eq!(lines.len(), 1000);
    // All fragments share the 400.50 bin; entries follow (precursor, scan) order
    let ids: Vec<i32> = lines[50].iter().map(|e| e.scan).collect();
    assert_eq!(ids, vec![5, 3, 9]);

    let rtt = read_retention_time_file(set.paths.rtt(2)).unwrap();
    let scans: Vec<i32> = rtt.iter().map(|e| e.scan).collect();
    assert_eq!(scans, vec![3, 5, 9]);
    assert_eq!(set.summary.msn_count(2), 3);
}

#[test]
fn test_precursor_mode_writes_tic_at_precursor_bin() {
    let dir = tempfile::tempdir().unwrap();
    let mut worker = ShardWorker::new(spec(400.0, 405.0));
    feed(
        &mut worker,
        vec![
            ms1(0, 1.0, Polarity::Positive, &[401.0]),
            ms2(1, 1.1, 402.0, 6.0),
            // Routed through the tolerance window but outside the write range
            ms2(2, 1.2, 405.5, 9.0),
        ],
    );

    let output = worker
        .write_to_chrom(&params(MsnMode::Precursor, 2, false), dir.path(), &AtomicBool::new(false))
        .unwrap();
    let set = &output.sets[0];
    let lines = read_lines(&set.paths.chrom(2));
    assert_eq!(lines.len(), 500);
    assert_eq!(lines[200], vec![LineEntry::new(1, 6.0)]);
    assert_eq!(lines.iter().filter(|l| !l.is_empty()).count(), 1);
    assert_eq!(set.summary.msn_count(2), 1);
}

#[test]
fn test_polarity_switching_splits_sets() {
    let dir = tempfile::tempdir().unwrap();
    let mut worker = ShardWorker::new(spec(400.0, 410.0));
    feed(
        &mut worker,
        vec![
            ms1(0, 1.0, Polarity::Positive, &[401.0]),
            ms1(1, 1.5, Polarity::Negative, &[402.0]),
            ms1(2, 2.0, Polarity::Positive, &[403.0]),
            ms1(3, 2.5, Polarity::Unknown, &[404.0]),
        ],
    );

    let output = worker
        .write_to_chrom(&params(MsnMode::Off, 1, true), dir.path(), &AtomicBool::new(false))
        .unwrap();
    assert_eq!(output.sets.len(), 2);
    assert_eq!(output.unknown_polarity, 1);

    let positive = &output.sets[0];
    assert_eq!(positive.paths.stem(), "run_positive");
    assert_eq!(positive.summary.ms1_retention_times, vec![1.0, 2.0]);
    let lines = read_lines(&positive.paths.chrom(1));
    assert_eq!(lines[300], vec![LineEntry::new(1, 10.0)]);

    let negative = &output.sets[1];
    assert_eq!(negative.paths.stem(), "run_negative");
    let lines = read_lines(&negative.paths.chrom(1));
    assert_eq!(lines[200], vec![LineEntry::new(0, 10.0)]);
    assert_eq!(lines.iter().filter(|l| !l.is_empty()).count(), 1);
}

#[test]
fn test_empty_levels_still_get_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut worker = ShardWorker::new(spec(400.0, 401.0));
    feed(&mut worker, vec![ms1(0, 1.0, Polarity::Positive, &[400.5])]);

    let output = worker
        .write_to_chrom(&params(MsnMode::Full, 3, false), dir.path(), &AtomicBool::new(false))
        .unwrap();
    let set = &output.sets[0];
    for level in 2..=3 {
        assert_eq!(set.level(level).unwrap().stats.lines, 100);
        assert_eq!(read_index_file(set.paths.index(level)).unwrap().len(), 2);
        assert!(read_retention_time_file(set.paths.rtt(level)).unwrap().is_empty());
    }
}

#[test]
fn test_overview_of_buffered_scans() {
    let mut worker = ShardWorker::new(ShardSpec::unbounded(ShardId::new(0, 0)));
    assert_eq!(worker.lower_threshold(), f64::NEG_INFINITY);
    feed(
        &mut worker,
        vec![
            ms1(0, 1.0, Polarity::Positive, &[401.0]),
            ms2(1, 1.1, 402.0, 6.0).with_range(100.0, 450.0),
        ],
    );
    let full = worker.overview(MsnMode::Full);
    assert_eq!((full.lowest_mz, full.highest_mz), (100.0, 450.0));
    let precursor = worker.overview(MsnMode::Precursor);
    assert_eq!((precursor.lowest_mz, precursor.highest_mz), (400.0, 410.0));
    assert_eq!(precursor.highest_ms_level, 2);
    assert_eq!(worker.buffered_scans(), 2);
}

#[test]
fn test_shard_thresholds_include_tolerance() {
    let shard = spec(400.0, 405.0);
    assert_eq!((shard.lower_threshold, shard.upper_threshold), (399.0, 406.0));
    assert_eq!(shard.line_count(&MzScale::new(1000, 0.01).unwrap()), 500);
    assert_eq!(ShardId::new(2, 1).to_string(), "2-1");
}
