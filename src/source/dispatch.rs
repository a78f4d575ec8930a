//! Fan-out of one scan stream to several shard consumers.

use log::debug;

use super::error::SinkError;
use super::ScanSink;
use crate::scan::{MsnMode, Scan, ScanHeader};

/// Routes each scan to every consumer whose m/z window it touches.
///
/// - MS1 scans go to every consumer, their peaks restricted to the consumer's
///   window. Empty scans are still delivered so every shard numbers MS1 scans
///   identically.
/// - MSn scans are attached by every consumer to its last base scan. In
///   [`MsnMode::Full`] their peaks are windowed like MS1 peaks; in
///   [`MsnMode::Precursor`] they are only delivered (without peaks) to consumers
///   whose window contains the precursor.
/// - Nested children supplied by the source are flattened after their parent.
pub struct ScanDispatcher<'a> {
    sinks: Vec<&'a mut dyn ScanSink>,
    msn: MsnMode,
    lower: f64,
    upper: f64,
    last_base: Option<Scan>,
    dropped_msn: usize,
}

impl<'a> ScanDispatcher<'a> {
    /// Dispatch to `sinks` using the given MSn handling.
    pub fn new(sinks: Vec<&'a mut dyn ScanSink>, msn: MsnMode) -> Self {
        let lower = sinks
            .iter()
            .map(|s| s.lower_threshold())
            .fold(f64::INFINITY, f64::min);
        let upper = sinks
            .iter()
            .map(|s| s.upper_threshold())
            .fold(f64::NEG_INFINITY, f64::max);
        Self {
            sinks,
            msn,
            lower,
            upper,
            last_base: None,
            dropped_msn: 0,
        }
    }

    /// MSn scans no consumer accepted.
    pub fn dropped_msn(&self) -> usize {
        self.dropped_msn
    }

    fn route_base(&mut self, scan: &Scan) -> Result<(), SinkError> {
        for sink in self.sinks.iter_mut() {
            let windowed = scan.restricted_to(sink.lower_threshold(), sink.upper_threshold());
            sink.add_scan(windowed)?;
        }
        self.last_base = Some(scan.restricted_to(0.0, 0.0));
        Ok(())
    }

    fn route_fragment(&mut self, scan: &Scan) -> Result<(), SinkError> {
        if !self.msn.is_enabled() {
            return Ok(());
        }
        if self.last_base.is_none() {
            return Err(SinkError::NoBaseScan {
                scan: scan.num,
                ms_level: scan.ms_level,
            });
        }

        let mut delivered = false;
        match self.msn {
            MsnMode::Precursor => {
                let Some(precursor) = scan.precursor_mz else {
                    debug!("MS{} scan {} has no precursor, skipped", scan.ms_level, scan.num);
                    self.dropped_msn += 1;
                    return Ok(());
                };
                for sink in self.sinks.iter_mut() {
                    if precursor >= sink.lower_threshold() && precursor < sink.upper_threshold() {
                        sink.add_scan(scan.restricted_to(0.0, 0.0))?;
                        delivered = true;
                    }
                }
            }
            _ => {
                for sink in self.sinks.iter_mut() {
                    sink.add_scan(scan.restricted_to(sink.lower_threshold(), sink.upper_threshold()))?;
                }
                delivered = !self.sinks.is_empty();
            }
        }

        if !delivered {
            debug!(
                "MS{} scan {} (precursor {:?}) outside every shard window, dropped",
                scan.ms_level, scan.num, scan.precursor_mz
            );
            self.dropped_msn += 1;
        }
        Ok(())
    }
}

impl ScanSink for ScanDispatcher<'_> {
    fn add_header(&mut self, header: ScanHeader) -> Result<(), SinkError> {
        self.last_base = None;
        for sink in self.sinks.iter_mut() {
            sink.add_header(header.clone())?;
        }
        Ok(())
    }

    fn add_scan(&mut self, mut scan: Scan) -> Result<(), SinkError> {
        let children = std::mem::take(&mut scan.children);
        if scan.ms_level <= 1 {
            self.route_base(&scan)?;
        } else {
            self.route_fragment(&scan)?;
        }
        for child in children {
            self.add_scan(child)?;
        }
        Ok(())
    }

    fn last_base_scan(&self) -> Option<&Scan> {
        self.last_base.as_ref()
    }

    fn add_parent_file_name(&mut self, name: &str) -> Result<(), SinkError> {
        for sink in self.sinks.iter_mut() {
            sink.add_parent_file_name(name)?;
        }
        Ok(())
    }

    fn lower_threshold(&self) -> f64 {
        self.lower
    }

    fn upper_threshold(&self) -> f64 {
        self.upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{PeakArrays, Polarity};

    /// Records what it receives.
    struct Recorder {
        lower: f64,
        upper: f64,
        headers: usize,
        scans: Vec<Scan>,
        name: Option<String>,
    }

    impl Recorder {
        fn new(lower: f64, upper: f64) -> Self {
            Self {
                lower,
                upper,
                headers: 0,
                scans: Vec::new(),
                name: None,
            }
        }
    }

    impl ScanSink for Recorder {
        fn add_header(&mut self, _header: ScanHeader) -> Result<(), SinkError> {
            self.headers += 1;
            Ok(())
        }

        fn add_scan(&mut self, scan: Scan) -> Result<(), SinkError> {
            self.scans.push(scan);
            Ok(())
        }

        fn last_base_scan(&self) -> Option<&Scan> {
            self.scans.iter().rev().find(|s| s.ms_level == 1)
        }

        fn add_parent_file_name(&mut self, name: &str) -> Result<(), SinkError> {
            self.name = Some(name.to_string());
            Ok(())
        }

        fn lower_threshold(&self) -> f64 {
            self.lower
        }

        fn upper_threshold(&self) -> f64 {
            self.upper
        }
    }

    fn ms1(num: i32) -> Scan {
        Scan::new_ms1(
            num,
            num as f32,
            Polarity::Positive,
            PeakArrays::new(vec![399.5, 404.5, 405.5, 410.5], vec![1.0, 2.0, 3.0, 4.0]),
        )
    }

    #[test]
    fn test_ms1_windowed_per_sink() {
        let mut a = Recorder::new(399.0, 406.0);
        let mut b = Recorder::new(404.0, 411.0);
        {
            let mut dispatcher = ScanDispatcher::new(vec![&mut a, &mut b], MsnMode::Full);
            assert_eq!(dispatcher.lower_threshold(), 399.0);
            assert_eq!(dispatcher.upper_threshold(), 411.0);
            dispatcher.add_header(ScanHeader::new(1)).unwrap();
            dispatcher.add_parent_file_name("run").unwrap();
            dispatcher.add_scan(ms1(0)).unwrap();
        }
        assert_eq!(a.scans[0].peaks.mz, vec![399.5, 404.5, 405.5]);
        assert_eq!(b.scans[0].peaks.mz, vec![404.5, 405.5, 410.5]);
        assert_eq!(a.name.as_deref(), Some("run"));
        assert_eq!(b.headers, 1);
    }

    #[test]
    fn test_empty_window_still_delivers_ms1() {
        let mut far = Recorder::new(900.0, 910.0);
        {
            let mut dispatcher = ScanDispatcher::new(vec![&mut far], MsnMode::Full);
            dispatcher.add_header(ScanHeader::new(1)).unwrap();
            dispatcher.add_scan(ms1(0)).unwrap();
        }
        assert_eq!(far.scans.len(), 1);
        assert!(far.scans[0].peaks.is_empty());
    }

    #[test]
    fn test_orphan_fragment_is_an_error() {
        let mut a = Recorder::new(0.0, 1000.0);
        let mut dispatcher = ScanDispatcher::new(vec![&mut a], MsnMode::Full);
        dispatcher.add_header(ScanHeader::new(1)).unwrap();
        let orphan = Scan::new_msn(7, 2, 1.0, Polarity::Positive, 500.0, PeakArrays::default());
        assert!(matches!(
            dispatcher.add_scan(orphan),
            Err(SinkError::NoBaseScan { scan: 7, ms_level: 2 })
        ));
    }

    #[test]
    fn test_precursor_outside_every_window_is_dropped() {
        let mut a = Recorder::new(399.0, 406.0);
        let mut b = Recorder::new(404.0, 411.0);
        let dropped;
        {
            let mut dispatcher = ScanDispatcher::new(vec![&mut a, &mut b], MsnMode::Precursor);
            dispatcher.add_header(ScanHeader::new(3)).unwrap();
            dispatcher.add_scan(ms1(0)).unwrap();
            let inside = Scan::new_msn(1, 2, 0.5, Polarity::Positive, 405.0, PeakArrays::default());
            let outside = Scan::new_msn(2, 2, 0.6, Polarity::Positive, 800.0, PeakArrays::default());
            dispatcher.add_scan(inside).unwrap();
            dispatcher.add_scan(outside).unwrap();
            dropped = dispatcher.dropped_msn();
        }
        assert_eq!(dropped, 1);
        // 405.0 lies in both tolerance windows
        assert_eq!(a.scans.len(), 2);
        assert_eq!(b.scans.len(), 2);
    }

    #[test]
    fn test_nested_children_are_flattened() {
        let mut a = Recorder::new(0.0, 1000.0);
        {
            let mut dispatcher = ScanDispatcher::new(vec![&mut a], MsnMode::Full);
            dispatcher.add_header(ScanHeader::new(2)).unwrap();
            let mut base = ms1(0);
            base.children.push(Scan::new_msn(
                1,
                2,
                0.1,
                Polarity::Positive,
                404.5,
                PeakArrays::new(vec![150.0], vec![9.0]),
            ));
            dispatcher.add_scan(base).unwrap();
        }
        assert_eq!(a.scans.len(), 2);
        assert_eq!(a.scans[1].ms_level, 2);
        assert!(a.scans[0].children.is_empty());
    }

    #[test]
    fn test_msn_off_ignores_fragments() {
        let mut a = Recorder::new(0.0, 1000.0);
        {
            let mut dispatcher = ScanDispatcher::new(vec![&mut a], MsnMode::Off);
            dispatcher.add_header(ScanHeader::new(2)).unwrap();
            dispatcher.add_scan(ms1(0)).unwrap();
            let frag = Scan::new_msn(1, 2, 0.1, Polarity::Positive, 404.5, PeakArrays::default());
            dispatcher.add_scan(frag).unwrap();
        }
        assert_eq!(a.scans.len(), 1);
    }
}
