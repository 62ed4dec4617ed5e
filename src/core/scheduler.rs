//! Periodic, single-flight execution of the build-then-filter cycle.
//!
//! The scheduler owns one worker slot. A tick that finds the slot holding an
//! unfinished worker is dropped, never queued, so two listing fetches can not
//! overlap. The slot is free again as soon as the worker thread exits, whether
//! the build succeeded, failed, or the presentation callback panicked.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use log::{debug, error, info};

use super::error::MonitorError;
use super::filters::{self, FilterCriterion};
use super::snapshot::{Snapshot, SnapshotBuilder};

const WAIT_POLL: Duration = Duration::from_millis(5);

pub type RefreshOutcome = Result<Snapshot, MonitorError>;

type PresentationCallback = Arc<dyn Fn(RefreshOutcome) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Started,
    Dropped,
}

/// Criterion shared between the control surface and the workers. Each cycle
/// loads it exactly once.
struct CriterionCell(AtomicU8);

impl CriterionCell {
    fn new(criterion: FilterCriterion) -> Self {
        Self(AtomicU8::new(criterion.to_u8()))
    }

    fn load(&self) -> FilterCriterion {
        FilterCriterion::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, criterion: FilterCriterion) {
        self.0.store(criterion.to_u8(), Ordering::Release);
    }
}

pub struct RefreshScheduler {
    builder: Arc<Mutex<SnapshotBuilder>>,
    criterion: CriterionCell,
    callback: PresentationCallback,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new<F>(builder: SnapshotBuilder, criterion: FilterCriterion, callback: F) -> Self
    where
        F: Fn(RefreshOutcome) + Send + Sync + 'static,
    {
        Self {
            builder: Arc::new(Mutex::new(builder)),
            criterion: CriterionCell::new(criterion),
            callback: Arc::new(callback),
            in_flight: Mutex::new(None),
        }
    }

    pub fn criterion(&self) -> FilterCriterion {
        self.criterion.load()
    }

    /// Takes effect on the next cycle; a build already running keeps the
    /// criterion it started with.
    pub fn set_criterion(&self, criterion: FilterCriterion) {
        self.criterion.store(criterion);
        info!("View filter set to {}", criterion);
    }

    pub fn is_running(&self) -> bool {
        self.slot()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Starts a cycle on a worker thread unless one is still running.
    pub fn tick(&self) -> TickOutcome {
        let mut slot = self.slot();

        if let Some(handle) = slot.as_ref() {
            if !handle.is_finished() {
                debug!("Refresh still running, tick dropped");
                return TickOutcome::Dropped;
            }
        }
        if let Some(finished) = slot.take() {
            if finished.join().is_err() {
                error!("Previous refresh worker panicked");
            }
        }

        let builder = Arc::clone(&self.builder);
        let callback = Arc::clone(&self.callback);
        let criterion = self.criterion.load();

        let spawned = thread::Builder::new()
            .name("snapshot-refresh".to_string())
            .spawn(move || run_cycle(&builder, criterion, &callback));

        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                TickOutcome::Started
            }
            Err(e) => {
                error!("Failed to spawn refresh worker: {}", e);
                TickOutcome::Dropped
            }
        }
    }

    /// Same single-flight path as a timer tick, used right after a filter change.
    pub fn trigger_now(&self) -> TickOutcome {
        self.tick()
    }

    /// Blocks until the in-flight cycle, if any, has completed. The worker
    /// keeps its slot while this waits, so ticks arriving meanwhile are still
    /// dropped.
    pub fn wait(&self) {
        loop {
            {
                let mut slot = self.slot();
                match slot.as_ref() {
                    None => return,
                    Some(handle) if handle.is_finished() => {
                        if let Some(finished) = slot.take() {
                            if finished.join().is_err() {
                                error!("Refresh worker panicked");
                            }
                        }
                        return;
                    }
                    Some(_) => {}
                }
            }
            thread::sleep(WAIT_POLL);
        }
    }

    /// Ticks immediately, then every `period`, until the handle is stopped or
    /// dropped.
    pub fn start(self: &Arc<Self>, period: Duration) -> TimerHandle {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let scheduler = Arc::clone(self);

        let thread = thread::Builder::new()
            .name("refresh-timer".to_string())
            .spawn(move || {
                let ticker = channel::tick(period);
                scheduler.tick();
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => {
                            scheduler.tick();
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
                debug!("Refresh timer stopped");
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn refresh timer: {}", e);
                None
            }
        };

        TimerHandle {
            stop: Some(stop_tx),
            thread,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_cycle(
    builder: &Mutex<SnapshotBuilder>,
    criterion: FilterCriterion,
    callback: &PresentationCallback,
) {
    let outcome = {
        let mut builder = builder.lock().unwrap_or_else(PoisonError::into_inner);
        builder
            .build()
            .map(|snapshot| filters::apply(&snapshot, criterion))
    };

    if let Err(e) = &outcome {
        error!("Refresh failed: {}", e);
    }

    if panic::catch_unwind(AssertUnwindSafe(|| callback(outcome))).is_err() {
        error!("Presentation callback panicked");
    }
}

/// Owns the periodic timer thread of a started scheduler.
pub struct TimerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Refresh timer panicked");
            }
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
