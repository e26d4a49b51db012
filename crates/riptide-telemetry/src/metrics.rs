//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counters cover engine background work, event fan-out, settings sync, adds and policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Prometheus-backed metrics registry shared by the engine crates.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    background_tasks_total: IntCounterVec,
    background_tasks_in_flight: IntGauge,
    events_dispatched_total: IntCounterVec,
    listener_failures_total: IntCounterVec,
    settings_applied_total: IntCounterVec,
    torrents_added_total: IntCounterVec,
    policy_reschedules_total: IntCounterVec,
    totals: Totals,
}

#[derive(Default)]
struct Totals {
    succeeded: AtomicU64,
    failed: AtomicU64,
    dispatched: AtomicU64,
    listener_failures: AtomicU64,
    settings_applied: AtomicU64,
    added: AtomicU64,
    pauses: AtomicU64,
}

/// Point-in-time totals for health reporting.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Background units currently running.
    pub background_tasks_in_flight: i64,
    /// Background units that completed successfully.
    pub background_tasks_succeeded: u64,
    /// Background units that returned an error or panicked.
    pub background_tasks_failed: u64,
    /// Engine events dispatched to listeners.
    pub events_dispatched: u64,
    /// Listener invocations that failed.
    pub listener_failures: u64,
    /// Settings keys pushed to the session.
    pub settings_applied: u64,
    /// Torrents added successfully.
    pub torrents_added: u64,
    /// Policy evaluations that paused transfers.
    pub policy_pauses: u64,
}

impl Metrics {
    /// Construct a registry with every engine collector registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be built or registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let background_tasks_total = register(
            &registry,
            "background_tasks_total",
            IntCounterVec::new(
                Opts::new(
                    "background_tasks_total",
                    "Background units of work by operation and outcome",
                ),
                &["operation", "status"],
            ),
        )?;
        let background_tasks_in_flight = register(
            &registry,
            "background_tasks_in_flight",
            IntGauge::with_opts(Opts::new(
                "background_tasks_in_flight",
                "Background units of work currently running",
            )),
        )?;
        let events_dispatched_total = register(
            &registry,
            "events_dispatched_total",
            IntCounterVec::new(
                Opts::new("events_dispatched_total", "Engine events dispatched by type"),
                &["type"],
            ),
        )?;
        let listener_failures_total = register(
            &registry,
            "listener_failures_total",
            IntCounterVec::new(
                Opts::new(
                    "listener_failures_total",
                    "Listener invocations that failed or panicked by event type",
                ),
                &["type"],
            ),
        )?;
        let settings_applied_total = register(
            &registry,
            "settings_applied_total",
            IntCounterVec::new(
                Opts::new(
                    "settings_applied_total",
                    "Settings keys pushed to the session",
                ),
                &["key"],
            ),
        )?;
        let torrents_added_total = register(
            &registry,
            "torrents_added_total",
            IntCounterVec::new(
                Opts::new("torrents_added_total", "Add-torrent attempts by outcome"),
                &["outcome"],
            ),
        )?;
        let policy_reschedules_total = register(
            &registry,
            "policy_reschedules_total",
            IntCounterVec::new(
                Opts::new(
                    "policy_reschedules_total",
                    "Policy evaluations by resulting decision",
                ),
                &["decision"],
            ),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                background_tasks_total,
                background_tasks_in_flight,
                events_dispatched_total,
                listener_failures_total,
                settings_applied_total,
                torrents_added_total,
                policy_reschedules_total,
                totals: Totals::default(),
            }),
        })
    }

    /// Record a finished background unit; `status` is `ok`, `error` or `panic`.
    pub fn inc_background_task(&self, operation: &str, status: &str) {
        self.inner
            .background_tasks_total
            .with_label_values(&[operation, status])
            .inc();
        let total = if status == "ok" {
            &self.inner.totals.succeeded
        } else {
            &self.inner.totals.failed
        };
        total.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the in-flight background unit gauge.
    pub fn set_background_in_flight(&self, count: usize) {
        self.inner
            .background_tasks_in_flight
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Record one dispatched event and the listeners that failed on it.
    pub fn record_dispatch(&self, event_type: &str, failed: usize) {
        self.inner
            .events_dispatched_total
            .with_label_values(&[event_type])
            .inc();
        self.inner.totals.dispatched.fetch_add(1, Ordering::Relaxed);
        if failed > 0 {
            let failed = u64::try_from(failed).unwrap_or(u64::MAX);
            self.inner
                .listener_failures_total
                .with_label_values(&[event_type])
                .inc_by(failed);
            self.inner
                .totals
                .listener_failures
                .fetch_add(failed, Ordering::Relaxed);
        }
    }

    /// Record a settings key pushed to the session.
    pub fn inc_settings_applied(&self, key: &str) {
        self.inner
            .settings_applied_total
            .with_label_values(&[key])
            .inc();
        self.inner
            .totals
            .settings_applied
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record an add-torrent outcome (`added`, `exists`, `failed`, `skipped`).
    pub fn inc_torrent_added(&self, outcome: &str) {
        self.inner
            .torrents_added_total
            .with_label_values(&[outcome])
            .inc();
        if outcome == "added" {
            self.inner.totals.added.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a policy decision (`pause`, `resume`, `stopped`).
    pub fn inc_policy_reschedule(&self, decision: &str) {
        self.inner
            .policy_reschedules_total
            .with_label_values(&[decision])
            .inc();
        if decision == "pause" {
            self.inner.totals.pauses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Render the registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the engine totals.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let totals = &self.inner.totals;
        MetricsSnapshot {
            background_tasks_in_flight: self.inner.background_tasks_in_flight.get(),
            background_tasks_succeeded: totals.succeeded.load(Ordering::Relaxed),
            background_tasks_failed: totals.failed.load(Ordering::Relaxed),
            events_dispatched: totals.dispatched.load(Ordering::Relaxed),
            listener_failures: totals.listener_failures.load(Ordering::Relaxed),
            settings_applied: totals.settings_applied.load(Ordering::Relaxed),
            torrents_added: totals.added.load(Ordering::Relaxed),
            policy_pauses: totals.pauses.load(Ordering::Relaxed),
        }
    }
}

fn register<C>(
    registry: &Registry,
    name: &'static str,
    collector: prometheus::Result<C>,
) -> TelemetryResult<C>
where
    C: Collector + Clone + 'static,
{
    let collector =
        collector.map_err(|source| TelemetryError::MetricsCollector { name, source })?;
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })?;
    Ok(collector)
}
