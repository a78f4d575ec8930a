//! Runs the shard workers of one iteration on their own threads.
//!
//! Each worker reports exactly once over a channel. The supervisor keeps a
//! status table, wakes on every report or heartbeat, and on the first failure
//! raises the shared abort flag. Aborted workers stop at their next batch
//! boundary; the supervisor still joins every thread before returning so no
//! worker outlives the directories it writes into.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use log::{debug, error, warn};

use super::error::TranslationError;
use crate::shard::{ChromParams, ShardError, ShardId, ShardOutput, ShardWorker};

/// Per-slot status as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Writing
    Running,
    /// Reported success
    Finished,
    /// Reported an error, or stopped after an abort
    Failed,
    /// Ended without reporting
    Panicked,
}

/// What a worker thread sends when it ends.
#[derive(Debug)]
pub(crate) struct ShardReport {
    slot: usize,
    shard: ShardId,
    result: Result<ShardOutput, ShardError>,
}

/// Supervises the worker threads of one iteration.
pub(crate) struct ShardSupervisor {
    abort: Arc<AtomicBool>,
    poll_interval: Duration,
}

impl ShardSupervisor {
    pub(crate) fn new(abort: Arc<AtomicBool>, poll_interval: Duration) -> Self {
        Self {
            abort,
            poll_interval,
        }
    }

    /// Write every `(worker, dir)` job on its own thread; outputs come back in
    /// job order.
    pub(crate) fn run(
        &self,
        jobs: Vec<(ShardWorker, PathBuf)>,
        params: Arc<ChromParams>,
    ) -> Result<Vec<ShardOutput>, TranslationError> {
        let (tx, rx) = unbounded::<ShardReport>();
        let mut shards = Vec::with_capacity(jobs.len());
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(jobs.len());

        for (slot, (worker, dir)) in jobs.into_iter().enumerate() {
            let shard = worker.spec().id;
            let tx = tx.clone();
            let params = Arc::clone(&params);
            let abort = Arc::clone(&self.abort);
            let spawned = thread::Builder::new()
                .name(format!("chrom-shard-{shard}"))
                .spawn(move || {
                    let result = worker.write_to_chrom(&params, &dir, &abort);
                    // The supervisor may already have given up on this iteration
                    let _ = tx.send(ShardReport {
                        slot,
                        shard,
                        result,
                    });
                });
            match spawned {
                Ok(handle) => {
                    shards.push(shard);
                    handles.push(handle);
                }
                Err(e) => {
                    self.abort.store(true, Ordering::SeqCst);
                    join_all(handles);
                    return Err(TranslationError::IoError(e));
                }
            }
        }
        drop(tx);

        let outcome = self.collect(&rx, &shards, &handles);
        join_all(handles);
        outcome
    }

    fn collect(
        &self,
        rx: &Receiver<ShardReport>,
        shards: &[ShardId],
        handles: &[JoinHandle<()>],
    ) -> Result<Vec<ShardOutput>, TranslationError> {
        let mut states = vec![WorkerState::Running; shards.len()];
        let mut outputs: Vec<Option<ShardOutput>> = (0..shards.len()).map(|_| None).collect();
        let mut first_error: Option<TranslationError> = None;

        while first_error.is_none() && states.contains(&WorkerState::Running) {
            match rx.recv_timeout(self.poll_interval) {
                Ok(report) => {
                    self.record(report, &mut states, &mut outputs, &mut first_error);
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Taken before draining: a thread that had exited by now has
                    // already queued its report
                    let exited: Vec<bool> = handles.iter().map(JoinHandle::is_finished).collect();
                    self.sweep(rx, &exited, shards, &mut states, &mut outputs, &mut first_error);
                    let running = states.iter().filter(|s| **s == WorkerState::Running).count();
                    debug!("{running} of {} shard workers still running", states.len());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    for (slot, state) in states.iter_mut().enumerate() {
                        if *state == WorkerState::Running {
                            *state = WorkerState::Panicked;
                            self.fail(
                                &mut first_error,
                                TranslationError::WorkerPanicked {
                                    shard: shards[slot],
                                },
                            );
                        }
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        // Aborted from outside the iteration
        if let Some(slot) = states.iter().position(|s| *s == WorkerState::Failed) {
            return Err(TranslationError::shard(shards[slot], ShardError::Aborted));
        }
        outputs
            .into_iter()
            .zip(shards)
            .map(|(output, shard)| output.ok_or(TranslationError::WorkerPanicked { shard: *shard }))
            .collect()
    }

    /// Record every queued report, then mark workers that had exited without
    /// one as panicked.
    fn sweep(
        &self,
        rx: &Receiver<ShardReport>,
        exited: &[bool],
        shards: &[ShardId],
        states: &mut [WorkerState],
        outputs: &mut [Option<ShardOutput>],
        first_error: &mut Option<TranslationError>,
    ) {
        while let Ok(report) = rx.try_recv() {
            self.record(report, states, outputs, first_error);
        }
        for (slot, exited) in exited.iter().enumerate() {
            if *exited && states[slot] == WorkerState::Running {
                states[slot] = WorkerState::Panicked;
                self.fail(
                    first_error,
                    TranslationError::WorkerPanicked {
                        shard: shards[slot],
                    },
                );
            }
        }
    }

    fn record(
        &self,
        report: ShardReport,
        states: &mut [WorkerState],
        outputs: &mut [Option<ShardOutput>],
        first_error: &mut Option<TranslationError>,
    ) {
        match report.result {
            Ok(output) => {
                debug!(
                    "Shard {} finished: {} lines",
                    report.shard,
                    output.lines_written()
                );
                states[report.slot] = WorkerState::Finished;
                outputs[report.slot] = Some(output);
            }
            Err(ShardError::Aborted) => {
                states[report.slot] = WorkerState::Failed;
            }
            Err(e) => {
                error!("Shard {} failed: {}", report.shard, e);
                states[report.slot] = WorkerState::Failed;
                self.fail(first_error, TranslationError::shard(report.shard, e));
            }
        }
    }

    fn fail(&self, first_error: &mut Option<TranslationError>, err: TranslationError) {
        if first_error.is_none() {
            warn!("Aborting remaining shard workers");
            self.abort.store(true, Ordering::SeqCst);
            *first_error = Some(err);
        }
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        // Panics were already reported through the status table
        let _ = handle.join();
    }
}
