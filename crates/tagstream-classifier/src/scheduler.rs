//! Flush scheduling
//!
//! A classifier never flushes inline on `input_stream`. It hands a flush task
//! to a [`FlushScheduler`], which runs it on a later tick. Schedulers are
//! shared freely between classifiers; each classifier cancels its own
//! superseded tasks, so a burst of fragments costs one flush per instance.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tagstream_core::{Error, Result};
use tokio::runtime::Handle;

/// Deferred flush
pub type FlushTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs flush tasks on a later tick
pub trait FlushScheduler: Send + Sync {
    /// Run `task` after the caller has returned
    fn schedule(&self, task: FlushTask);
}

/// Runs flushes on a tokio runtime after one cooperative yield
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Bind to the runtime of the calling context
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| Error::config(format!("no tokio runtime for flush scheduling: {e}")))?;
        Ok(Self::with_handle(handle))
    }

    /// Bind to an explicit runtime handle
    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl FlushScheduler for TokioScheduler {
    fn schedule(&self, task: FlushTask) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}

/// Runs every flush immediately, on the caller's stack
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl FlushScheduler for ImmediateScheduler {
    fn schedule(&self, task: FlushTask) {
        task();
    }
}

/// Queues flushes until the owner runs a tick
///
/// Lets tests decide exactly when a "tick" happens.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Vec<FlushTask>>,
    scheduled: AtomicUsize,
}

impl ManualScheduler {
    /// Create a scheduler with nothing queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one tick: every task queued so far, in order; true if any ran.
    ///
    /// Tasks scheduled while the tick runs wait for the next one.
    pub fn run_pending(&self) -> bool {
        let tasks = std::mem::take(&mut *self.queue.lock());
        let ran = !tasks.is_empty();
        for task in tasks {
            task();
        }
        ran
    }

    /// Number of queued tasks
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Total `schedule` calls
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.load(Ordering::Relaxed)
    }
}

impl FlushScheduler for ManualScheduler {
    fn schedule(&self, task: FlushTask) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().push(task);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending_count())
            .field("scheduled", &self.scheduled_count())
            .finish()
    }
}
