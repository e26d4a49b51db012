//! Background execution for session operations.
//!
//! # Design
//! - `submit` returns immediately; the closure runs on the blocking pool.
//! - Errors and panics stop at the unit boundary and surface as a tracing
//!   event plus a `background_tasks_total` sample.
//! - An in-flight counter backs `wait_idle`, so shutdown paths and tests can
//!   await quiescence without polling.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use riptide_telemetry::Metrics;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

use crate::error::{EngineError, EngineResult};

/// Fire-and-forget executor for units of work.
#[derive(Clone)]
pub struct TaskExecutor {
    handle: Handle,
    metrics: Metrics,
    tracker: Arc<Tracker>,
}

#[derive(Default)]
struct Tracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

struct InFlight {
    tracker: Arc<Tracker>,
    metrics: Metrics,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let remaining = self
            .tracker
            .in_flight
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        self.metrics.set_background_in_flight(remaining);
        if remaining == 0 {
            self.tracker.idle.notify_waiters();
        }
    }
}

impl TaskExecutor {
    /// Executor spawning onto `handle`.
    #[must_use]
    pub fn new(handle: Handle, metrics: Metrics) -> Self {
        Self {
            handle,
            metrics,
            tracker: Arc::new(Tracker::default()),
        }
    }

    /// Executor bound to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoRuntime`] outside a Tokio runtime.
    pub fn current(metrics: Metrics) -> EngineResult<Self> {
        let handle = Handle::try_current().map_err(|source| EngineError::NoRuntime { source })?;
        Ok(Self::new(handle, metrics))
    }

    /// Run a blocking closure in the background.
    pub fn submit<F>(&self, operation: &'static str, work: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let guard = self.begin();
        let metrics = self.metrics.clone();
        self.handle.spawn(async move {
            let outcome = tokio::task::spawn_blocking(work).await;
            report(&metrics, operation, outcome);
            drop(guard);
        });
    }

    /// Run a blocking closure and wait for it. The unit counts as in flight
    /// and is reported like a submitted one; its failure is not returned.
    pub async fn run<F>(&self, operation: &'static str, work: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        let guard = self.begin();
        let outcome = tokio::task::spawn_blocking(work).await;
        report(&self.metrics, operation, outcome);
        drop(guard);
    }

    /// Run a future in the background.
    pub fn submit_async<Fut>(&self, operation: &'static str, work: Fut)
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let guard = self.begin();
        let metrics = self.metrics.clone();
        self.handle.spawn(async move {
            let outcome = tokio::spawn(work).await;
            report(&metrics, operation, outcome);
            drop(guard);
        });
    }

    /// Units submitted but not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight.load(Ordering::Acquire)
    }

    /// Wait until no unit is running, including units submitted by units.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.tracker.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Runtime handle the executor spawns onto.
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    fn begin(&self) -> InFlight {
        let current = self.tracker.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.metrics.set_background_in_flight(current);
        InFlight {
            tracker: Arc::clone(&self.tracker),
            metrics: self.metrics.clone(),
        }
    }
}

fn report(
    metrics: &Metrics,
    operation: &'static str,
    outcome: Result<anyhow::Result<()>, JoinError>,
) {
    match outcome {
        Ok(Ok(())) => {
            debug!(operation, "background operation finished");
            metrics.inc_background_task(operation, "ok");
        }
        Ok(Err(err)) => {
            warn!(operation, error = %format!("{err:#}"), "background operation failed");
            metrics.inc_background_task(operation, "error");
        }
        Err(err) if err.is_panic() => {
            error!(operation, "background operation panicked");
            metrics.inc_background_task(operation, "panic");
        }
        Err(err) => {
            debug!(operation, error = %err, "background operation cancelled");
            metrics.inc_background_task(operation, "cancelled");
        }
    }
}
