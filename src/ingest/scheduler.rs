//! Repeating ingestion scheduler.
//!
//! The scheduler owns one tokio task that sleeps for the configured
//! interval, runs a cycle to completion, and sleeps again. Cancellation is
//! a `watch` signal observed between cycles; an in-flight cycle is never
//! aborted. Errors and panics escaping a cycle are logged and the loop
//! keeps going.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::coordinator::CycleRunner;
use super::fault;
use crate::{ReaderError, Result};

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

struct Inner {
    state: SchedulerState,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

/// Runs ingestion cycles at a fixed interval until stopped.
///
/// Dropping a running scheduler drops its shutdown sender, so the loop exits
/// at its next wait without being joined. Call [`Scheduler::stop`] to wait
/// for an in-flight cycle to finish.
pub struct Scheduler {
    runner: Arc<dyn CycleRunner>,
    interval: Duration,
    run_on_start: bool,
    cycles: Arc<AtomicU64>,
    inner: Mutex<Inner>,
}

impl Scheduler {
    /// Create an idle scheduler.
    pub fn new(runner: Arc<dyn CycleRunner>, interval: Duration) -> Self {
        Self {
            runner,
            interval,
            run_on_start: false,
            cycles: Arc::new(AtomicU64::new(0)),
            inner: Mutex::new(Inner {
                state: SchedulerState::Idle,
                shutdown: None,
                handle: None,
            }),
        }
    }

    /// Run the first cycle immediately instead of after one interval.
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.lock().state
    }

    /// Cycles started by this scheduler, across restarts.
    pub fn cycles_run(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Start the control loop and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.lock();
        match inner.state {
            SchedulerState::Idle | SchedulerState::Stopped => {}
            state => {
                return Err(ReaderError::Scheduler(format!(
                    "cannot start scheduler in state {:?}",
                    state
                )));
            }
        }

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(control_loop(
            self.runner.clone(),
            self.interval,
            self.run_on_start,
            rx,
            self.cycles.clone(),
        ));

        inner.shutdown = Some(tx);
        inner.handle = Some(handle);
        inner.state = SchedulerState::Running;
        info!(
            "Ingestion scheduler started (interval: {} seconds)",
            self.interval.as_secs()
        );
        Ok(())
    }

    /// Signal the loop to stop and wait until it has exited.
    ///
    /// A scheduler that is not running is left as is.
    pub async fn stop(&self) {
        let (shutdown, handle) = {
            let mut inner = self.lock();
            if inner.state != SchedulerState::Running {
                return;
            }
            inner.state = SchedulerState::Stopping;
            (inner.shutdown.take(), inner.handle.take())
        };

        if let Some(tx) = shutdown {
            // Fails only if the loop already exited
            let _ = tx.send(true);
        }
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Ingestion scheduler task ended abnormally: {}", e);
            }
        }

        self.lock().state = SchedulerState::Stopped;
        info!("Ingestion scheduler stopped");
    }
}

async fn control_loop(
    runner: Arc<dyn CycleRunner>,
    interval: Duration,
    run_on_start: bool,
    mut shutdown: watch::Receiver<bool>,
    cycles: Arc<AtomicU64>,
) {
    let mut skip_wait = run_on_start;

    loop {
        if !skip_wait {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        skip_wait = false;

        if *shutdown.borrow() {
            break;
        }

        let n = cycles.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Starting ingestion cycle #{}", n);
        match fault::guard("ingestion cycle", runner.run_cycle()).await {
            Ok(report) => debug!(
                "Ingestion cycle #{} created {} articles",
                n,
                report.total_created()
            ),
            Err(e) => error!("Ingestion cycle #{} failed: {}", n, e),
        }
    }

    debug!("Ingestion scheduler loop exited");
}
