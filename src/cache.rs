use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::fetch::Fetcher;
use crate::latency::{FetchLatency, LatencyStats};
use crate::resource::ResourceKind;
use crate::types::*;

/// Outcome of one invalidation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Invalidation {
    /// A fetch was started for the key.
    Issued,
    /// A fetch is in flight or started within the dedup window.
    Deduplicated,
}

/// Callback invoked with the new state after every completed fetch.
pub type ChangeListener = Arc<dyn Fn(ResourceKind, &ResourceState) + Send + Sync>;

/// Invalidate-and-notify contract the refresh coordinator is written against.
pub trait ResourceCache: Send + Sync {
    fn invalidate(&self, key: ResourceKind) -> Invalidation;

    fn subscribe(&self, key: ResourceKind, on_change: ChangeListener) -> Subscription;
}

/// Latest known state of one resource.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceState {
    pub data: Option<Arc<Document>>,
    pub error: Option<String>,
    pub loading: bool,
    pub version: u64,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl ResourceState {
    pub fn coins(&self) -> Option<&CoinsDoc> {
        match self.data.as_deref() {
            Some(Document::Coins(d)) => Some(d),
            _ => None,
        }
    }

    pub fn signals(&self) -> Option<&SignalsDoc> {
        match self.data.as_deref() {
            Some(Document::Signals(d)) => Some(d),
            _ => None,
        }
    }

    pub fn alarms(&self) -> Option<&AlarmsDoc> {
        match self.data.as_deref() {
            Some(Document::Alarms(d)) => Some(d),
            _ => None,
        }
    }

    pub fn ohlcv(&self) -> Option<&OhlcvDoc> {
        match self.data.as_deref() {
            Some(Document::Ohlcv(d)) => Some(d),
            _ => None,
        }
    }

    pub fn smc(&self) -> Option<&SmcPaData> {
        match self.data.as_deref() {
            Some(Document::SmcPa(d)) => Some(d),
            _ => None,
        }
    }
}

/// Point-in-time copy of every slot, handed to the view layer.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    states: HashMap<ResourceKind, ResourceState>,
}

impl Snapshot {
    pub fn from_states(states: HashMap<ResourceKind, ResourceState>) -> Self {
        Self { states }
    }

    pub fn state(&self, kind: ResourceKind) -> &ResourceState {
        static EMPTY: std::sync::OnceLock<ResourceState> = std::sync::OnceLock::new();
        self.states
            .get(&kind)
            .unwrap_or_else(|| EMPTY.get_or_init(ResourceState::default))
    }

    pub fn coins(&self) -> Option<&CoinsDoc> {
        self.state(ResourceKind::Coins).coins()
    }

    pub fn signals(&self) -> Option<&SignalsDoc> {
        self.state(ResourceKind::Signals).signals()
    }

    pub fn alarms(&self) -> Option<&AlarmsDoc> {
        self.state(ResourceKind::Alarms).alarms()
    }

    pub fn ohlcv(&self) -> Option<&OhlcvDoc> {
        self.state(ResourceKind::Ohlcv).ohlcv()
    }

    pub fn smc(&self) -> Option<&SmcPaData> {
        self.state(ResourceKind::SmcPa).smc()
    }
}

#[derive(Default)]
struct SlotMeta {
    in_flight: bool,
    last_started: Option<Instant>,
}

struct Slot {
    state: watch::Sender<ResourceState>,
    meta: Mutex<SlotMeta>,
    listeners: Mutex<Vec<(u64, ChangeListener)>>,
    latency: Mutex<FetchLatency>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: watch::channel(ResourceState::default()).0,
            meta: Mutex::new(SlotMeta::default()),
            listeners: Mutex::new(Vec::new()),
            latency: Mutex::new(FetchLatency::new()),
        }
    }
}

struct CacheInner {
    fetcher: Arc<dyn Fetcher>,
    dedup_window: Duration,
    slots: HashMap<ResourceKind, Slot>,
    next_listener_id: AtomicU64,
}

impl CacheInner {
    fn slot(&self, kind: ResourceKind) -> &Slot {
        // Every kind gets a slot at construction.
        &self.slots[&kind]
    }
}

/// Keyed document cache with fetch deduplication.
///
/// Clone-able via internal Arc.
#[derive(Clone)]
pub struct DocumentCache {
    inner: Arc<CacheInner>,
}

impl DocumentCache {
    pub fn new(fetcher: Arc<dyn Fetcher>, dedup_window: Duration) -> Self {
        let slots = ResourceKind::ALL.iter().map(|k| (*k, Slot::new())).collect();
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                dedup_window,
                slots,
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn dedup_window(&self) -> Duration {
        self.inner.dedup_window
    }

    pub fn get(&self, kind: ResourceKind) -> ResourceState {
        self.inner.slot(kind).state.borrow().clone()
    }

    pub fn watch(&self, kind: ResourceKind) -> watch::Receiver<ResourceState> {
        self.inner.slot(kind).state.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_states(ResourceKind::ALL.iter().map(|k| (*k, self.get(*k))).collect())
    }

    pub fn latency(&self, kind: ResourceKind) -> LatencyStats {
        lock(&self.inner.slot(kind).latency).stats()
    }

    pub fn fetch_counts(&self, kind: ResourceKind) -> (u64, u64) {
        let lat = lock(&self.inner.slot(kind).latency);
        (lat.successes(), lat.failures())
    }

    /// Wait until no fetch is in flight for `kind`.
    pub async fn settled(&self, kind: ResourceKind) -> ResourceState {
        let mut rx = self.watch(kind);
        // Bound first so the watch guard drops before `rx`.
        let settled = match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.get(kind),
        };
        settled
    }

    /// Wait until every resource has settled.
    pub async fn settled_all(&self) -> Snapshot {
        for kind in ResourceKind::ALL {
            self.settled(kind).await;
        }
        self.snapshot()
    }

    fn begin(&self, kind: ResourceKind) -> Invalidation {
        let slot = self.inner.slot(kind);
        let mut meta = lock(&slot.meta);
        let now = Instant::now();
        let recent = meta
            .last_started
            .is_some_and(|t| now.duration_since(t) < self.inner.dedup_window);
        if meta.in_flight || recent {
            return Invalidation::Deduplicated;
        }
        meta.in_flight = true;
        meta.last_started = Some(now);
        drop(meta);

        slot.state.send_modify(|s| s.loading = true);
        Invalidation::Issued
    }

    async fn run_fetch(inner: Arc<CacheInner>, kind: ResourceKind) {
        let started = Instant::now();
        let result = inner.fetcher.fetch(kind).await;
        let elapsed = started.elapsed();
        let slot = inner.slot(kind);

        lock(&slot.latency).record(elapsed, result.is_ok());

        match &result {
            Ok(doc) => tracing::debug!(
                resource = %kind,
                entries = doc.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "fetch complete"
            ),
            Err(e) => tracing::warn!(resource = %kind, error = %e, "fetch failed"),
        }

        // Publish under the meta lock so a new fetch cannot start before
        // `loading` is cleared for this one.
        let mut meta = lock(&slot.meta);
        slot.state.send_modify(|s| {
            s.loading = false;
            s.version += 1;
            match result {
                Ok(doc) => {
                    s.data = Some(Arc::new(doc));
                    s.error = None;
                    s.fetched_at = Some(Utc::now());
                }
                // Keep the last good document; the panel shows it as stale.
                Err(e) => s.error = Some(e.to_string()),
            }
        });
        meta.in_flight = false;
        drop(meta);

        let state = slot.state.borrow().clone();
        let listeners: Vec<ChangeListener> =
            lock(&slot.listeners).iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(kind, &state);
        }
    }
}

impl ResourceCache for DocumentCache {
    fn invalidate(&self, key: ResourceKind) -> Invalidation {
        let outcome = self.begin(key);
        if outcome == Invalidation::Issued {
            tokio::spawn(Self::run_fetch(Arc::clone(&self.inner), key));
        } else {
            tracing::trace!(resource = %key, "invalidation deduplicated");
        }
        outcome
    }

    fn subscribe(&self, key: ResourceKind, on_change: ChangeListener) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.slot(key).listeners).push((id, on_change));
        Subscription {
            cache: Arc::downgrade(&self.inner),
            key,
            id,
            active: true,
        }
    }
}

/// Registration returned by [`ResourceCache::subscribe`]. Deregisters on drop.
pub struct Subscription {
    cache: Weak<CacheInner>,
    key: ResourceKind,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn key(&self) -> ResourceKind {
        self.key
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the listener registered for the lifetime of the cache.
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.cache.upgrade() {
            lock(&inner.slot(self.key).listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// A poisoned slot lock only means a listener panicked; the data is still usable.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
