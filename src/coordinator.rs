use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cache::{Invalidation, ResourceCache};
use crate::error::DashError;
use crate::lifecycle::{LifecycleEvent, LifecycleSignals};
use crate::resource::ResourceKind;

/// What caused a refresh batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Timer,
    Focus,
    Connectivity,
}

impl Trigger {
    fn from_event(event: LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::FocusRegained => Trigger::Focus,
            LifecycleEvent::ConnectivityRestored => Trigger::Connectivity,
        }
    }
}

/// Result of one refresh-all batch. Every kind appears in exactly one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub trigger: Trigger,
    pub issued: Vec<ResourceKind>,
    pub deduplicated: Vec<ResourceKind>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStats {
    pub manual_batches: u64,
    pub timer_ticks: u64,
    pub focus_batches: u64,
    pub connectivity_batches: u64,
    pub fetches_issued: u64,
    pub fetches_deduplicated: u64,
}

#[derive(Default)]
struct Counters {
    manual: AtomicU64,
    timer: AtomicU64,
    focus: AtomicU64,
    connectivity: AtomicU64,
    issued: AtomicU64,
    deduplicated: AtomicU64,
}

impl Counters {
    fn record(&self, report: &RefreshReport) {
        let counter = match report.trigger {
            Trigger::Manual => &self.manual,
            Trigger::Timer => &self.timer,
            Trigger::Focus => &self.focus,
            Trigger::Connectivity => &self.connectivity,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.issued.fetch_add(report.issued.len() as u64, Ordering::Relaxed);
        self.deduplicated
            .fetch_add(report.deduplicated.len() as u64, Ordering::Relaxed);
    }
}

struct Timer {
    handle: JoinHandle<()>,
    interval: Duration,
}

struct Inner {
    cache: Arc<dyn ResourceCache>,
    counters: Arc<Counters>,
    timer: Mutex<Option<Timer>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.handle.abort();
        }
    }
}

/// Keeps cached documents fresh: on a timer, on demand and on lifecycle
/// events. Built explicitly and passed to whoever needs it.
///
/// Clone-able via internal Arc; the timer stops when the last clone drops.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(cache: Arc<dyn ResourceCache>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                counters: Arc::new(Counters::default()),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Start the recurring refresh. Replaces any running timer.
    /// The first tick fires one `interval` after the call.
    pub fn start(&self, interval: Duration) -> Result<(), DashError> {
        if interval.is_zero() {
            return Err(DashError::Config("refresh interval must be positive".into()));
        }

        let cache = Arc::clone(&self.inner.cache);
        let counters = Arc::clone(&self.inner.counters);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = refresh_kinds(cache.as_ref(), &counters, Trigger::Timer, &ResourceKind::ALL);
                tracing::debug!(issued = report.issued.len(), "timer refresh");
            }
        });

        let previous = lock(&self.inner.timer).replace(Timer { handle, interval });
        if let Some(prev) = previous {
            prev.handle.abort();
            tracing::info!(
                previous_secs = prev.interval.as_secs_f64(),
                interval_secs = interval.as_secs_f64(),
                "auto-refresh restarted"
            );
        } else {
            tracing::info!(interval_secs = interval.as_secs_f64(), "auto-refresh started");
        }
        Ok(())
    }

    /// Cancel the timer. Safe to call when not running.
    pub fn stop(&self) {
        if let Some(timer) = lock(&self.inner.timer).take() {
            timer.handle.abort();
            tracing::info!("auto-refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.timer).is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        lock(&self.inner.timer).as_ref().map(|t| t.interval)
    }

    /// Invalidate every resource. Resolves once all re-fetches are issued.
    pub async fn refresh_all(&self) -> RefreshReport {
        let report = refresh_kinds(
            self.inner.cache.as_ref(),
            &self.inner.counters,
            Trigger::Manual,
            &ResourceKind::ALL,
        );
        tracing::info!(
            issued = report.issued.len(),
            deduplicated = report.deduplicated.len(),
            "refreshing all data"
        );
        report
    }

    /// Invalidate a single resource by name.
    pub fn refresh_one(&self, kind: &str) -> Result<Invalidation, DashError> {
        let kind: ResourceKind = kind.parse()?;
        Ok(self.refresh(kind))
    }

    pub fn refresh(&self, kind: ResourceKind) -> Invalidation {
        let outcome = self.inner.cache.invalidate(kind);
        tracing::info!(resource = %kind, outcome = ?outcome, "refreshing resource");
        outcome
    }

    /// Refresh everything whenever focus is regained.
    pub fn on_focus_regained(&self, signals: &LifecycleSignals) -> ListenerHandle {
        self.listen(signals, LifecycleEvent::FocusRegained)
    }

    /// Refresh everything whenever connectivity is restored.
    pub fn on_connectivity_restored(&self, signals: &LifecycleSignals) -> ListenerHandle {
        self.listen(signals, LifecycleEvent::ConnectivityRestored)
    }

    fn listen(&self, signals: &LifecycleSignals, event: LifecycleEvent) -> ListenerHandle {
        // Subscribe before spawning so events emitted right after
        // registration are not missed.
        let mut rx = signals.subscribe();
        let cache = Arc::clone(&self.inner.cache);
        let counters = Arc::clone(&self.inner.counters);
        let trigger = Trigger::from_event(event);

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev == event => {}
                    Ok(_) => continue,
                    // Missed events collapse into one refresh.
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
                let report = refresh_kinds(cache.as_ref(), &counters, trigger, &ResourceKind::ALL);
                tracing::info!(
                    event = event.label(),
                    issued = report.issued.len(),
                    deduplicated = report.deduplicated.len(),
                    "lifecycle refresh"
                );
            }
        });

        ListenerHandle { handle: Some(handle), event }
    }

    pub fn stats(&self) -> RefreshStats {
        let c = &self.inner.counters;
        RefreshStats {
            manual_batches: c.manual.load(Ordering::Relaxed),
            timer_ticks: c.timer.load(Ordering::Relaxed),
            focus_batches: c.focus.load(Ordering::Relaxed),
            connectivity_batches: c.connectivity.load(Ordering::Relaxed),
            fetches_issued: c.issued.load(Ordering::Relaxed),
            fetches_deduplicated: c.deduplicated.load(Ordering::Relaxed),
        }
    }
}

/// Registration of one lifecycle listener. Cancelling or dropping it stops
/// the listener.
pub struct ListenerHandle {
    handle: Option<JoinHandle<()>>,
    event: LifecycleEvent,
}

impl ListenerHandle {
    pub fn event(&self) -> LifecycleEvent {
        self.event
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

fn refresh_kinds(
    cache: &dyn ResourceCache,
    counters: &Counters,
    trigger: Trigger,
    kinds: &[ResourceKind],
) -> RefreshReport {
    let mut report = RefreshReport {
        trigger,
        issued: Vec::with_capacity(kinds.len()),
        deduplicated: Vec::new(),
    };
    for kind in kinds {
        match cache.invalidate(*kind) {
            Invalidation::Issued => report.issued.push(*kind),
            Invalidation::Deduplicated => report.deduplicated.push(*kind),
        }
    }
    counters.record(&report);
    report
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
