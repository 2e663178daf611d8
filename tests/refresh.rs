//! Refresh coordination: timer lifecycle, lifecycle listeners, and the
//! cache's per-key deduplication and failure isolation.
//!
//! All tests run on a paused clock so timer behaviour is exact.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use margingate_dash::cache::{ChangeListener, DocumentCache, Invalidation, ResourceCache, ResourceState};
use margingate_dash::config::DashConfig;
use margingate_dash::coordinator::{RefreshCoordinator, Trigger};
use margingate_dash::dashboard::Dashboard;
use margingate_dash::error::DashError;
use margingate_dash::fetch::Fetcher;
use margingate_dash::generator::{MarketGenerator, SyntheticFetcher};
use margingate_dash::lifecycle::{LifecycleEvent, LifecycleSignals};
use margingate_dash::resource::ResourceKind;
use margingate_dash::types::*;
use margingate_dash::views::PanelStatus;

const DEDUP: Duration = Duration::from_secs(60);

/// Fetcher that counts calls per kind and fails the kinds it is told to.
#[derive(Default)]
struct CountingFetcher {
    calls: Mutex<HashMap<ResourceKind, usize>>,
    failing: HashSet<ResourceKind>,
    /// Fail every call after the first one, for every kind.
    fail_after_first: AtomicBool,
    delay: Duration,
}

impl CountingFetcher {
    fn new() -> Self {
        Self::default()
    }

    fn failing(kind: ResourceKind) -> Self {
        Self { failing: HashSet::from([kind]), ..Self::default() }
    }

    fn calls(&self, kind: ResourceKind) -> usize {
        self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

fn empty_document(kind: ResourceKind) -> Document {
    match kind {
        ResourceKind::Coins => Document::Coins(CoinsDoc {
            last_update: Some("2024-01-01T00:00:00".into()),
            coins: vec![Coin {
                symbol: "BTCUSDT".into(),
                last_price: 67_000.0,
                price_change_percent: 1.5,
                volume: 1e9,
            }],
        }),
        ResourceKind::Signals => Document::Signals(SignalsDoc::default()),
        ResourceKind::Alarms => Document::Alarms(AlarmsDoc::default()),
        ResourceKind::Ohlcv => Document::Ohlcv(OhlcvDoc::default()),
        ResourceKind::SmcPa => Document::SmcPa(SmcPaData::default()),
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, kind: ResourceKind) -> BoxFuture<'_, Result<Document, DashError>> {
        Box::pin(async move {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(kind).or_insert(0);
                *n += 1;
                *n
            };
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.contains(&kind) || (n > 1 && self.fail_after_first.load(Ordering::SeqCst)) {
                return Err(DashError::Fetch(format!("{kind} returned 503 Service Unavailable")));
            }
            Ok(empty_document(kind))
        })
    }
}

fn setup(fetcher: Arc<CountingFetcher>, dedup: Duration) -> (DocumentCache, RefreshCoordinator) {
    let cache = DocumentCache::new(fetcher, dedup);
    let coordinator = RefreshCoordinator::new(Arc::new(cache.clone()));
    (cache, coordinator)
}

// ── Test 1: focus events inside the dedup window ──
// Timer at 300 s, two focus events 50 ms apart: one fetch per resource.
#[tokio::test(start_paused = true)]
async fn test_focus_burst_fetches_each_resource_once() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), DEDUP);
    coordinator.start(Duration::from_millis(300_000)).unwrap();

    let signals = LifecycleSignals::new();
    let _focus = coordinator.on_focus_regained(&signals);

    signals.emit(LifecycleEvent::FocusRegained);
    tokio::time::sleep(Duration::from_millis(50)).await;
    signals.emit(LifecycleEvent::FocusRegained);
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.settled_all().await;

    assert_eq!(fetcher.total(), ResourceKind::ALL.len());
    for kind in ResourceKind::ALL {
        assert_eq!(fetcher.calls(kind), 1, "{kind} fetched more than once");
    }

    let stats = coordinator.stats();
    assert_eq!(stats.focus_batches, 2);
    assert_eq!(stats.timer_ticks, 0);
    assert_eq!(stats.fetches_issued, 5);
    assert_eq!(stats.fetches_deduplicated, 5);
}

// ── Test 2: refresh_all is idempotent within the dedup window ──
#[tokio::test(start_paused = true)]
async fn test_refresh_all_dedups_until_window_expires() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), DEDUP);

    let first = coordinator.refresh_all().await;
    assert_eq!(first.trigger, Trigger::Manual);
    assert_eq!(first.issued, ResourceKind::ALL.to_vec());
    cache.settled_all().await;

    for _ in 0..3 {
        let again = coordinator.refresh_all().await;
        assert!(again.issued.is_empty());
        assert_eq!(again.deduplicated.len(), 5);
    }
    assert_eq!(fetcher.total(), 5);

    tokio::time::sleep(DEDUP + Duration::from_millis(1)).await;
    let later = coordinator.refresh_all().await;
    assert_eq!(later.issued.len(), 5);
    cache.settled_all().await;
    assert_eq!(fetcher.total(), 10);
}

// ── Test 3: an in-flight fetch dedups even with no window ──
#[tokio::test(start_paused = true)]
async fn test_in_flight_fetch_is_not_duplicated() {
    let fetcher = Arc::new(CountingFetcher { delay: Duration::from_secs(2), ..CountingFetcher::default() });
    let (cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);

    assert_eq!(coordinator.refresh(ResourceKind::Coins), Invalidation::Issued);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(cache.get(ResourceKind::Coins).loading);
    assert_eq!(coordinator.refresh(ResourceKind::Coins), Invalidation::Deduplicated);

    let state = cache.settled(ResourceKind::Coins).await;
    assert!(!state.loading);
    assert_eq!(fetcher.calls(ResourceKind::Coins), 1);
    assert_eq!(coordinator.refresh(ResourceKind::Coins), Invalidation::Issued);
}

// ── Test 4: stop() cancels the timer ──
#[tokio::test(start_paused = true)]
async fn test_stop_prevents_timer_refreshes() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (_cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);

    coordinator.start(Duration::from_millis(100)).unwrap();
    assert!(coordinator.is_running());
    coordinator.stop();
    assert!(!coordinator.is_running());
    assert_eq!(coordinator.interval(), None);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(coordinator.stats().timer_ticks, 0);
    assert_eq!(fetcher.total(), 0);

    // Stopping twice is harmless.
    coordinator.stop();
}

// ── Test 5: start() replaces a running timer ──
// The 100 ms timer would tick 6 times in 600 ms; only the 250 ms one runs.
#[tokio::test(start_paused = true)]
async fn test_restart_leaves_single_timer() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (_cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);

    coordinator.start(Duration::from_millis(100)).unwrap();
    coordinator.start(Duration::from_millis(250)).unwrap();
    assert_eq!(coordinator.interval(), Some(Duration::from_millis(250)));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(coordinator.stats().timer_ticks, 2);
}

// ── Test 6: first timer tick waits a full interval ──
#[tokio::test(start_paused = true)]
async fn test_timer_first_tick_after_interval() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);

    coordinator.start(Duration::from_secs(300)).unwrap();
    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(fetcher.total(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    cache.settled_all().await;
    assert_eq!(coordinator.stats().timer_ticks, 1);
    assert_eq!(fetcher.total(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_rejected() {
    let (_cache, coordinator) = setup(Arc::new(CountingFetcher::new()), DEDUP);
    let err = coordinator.start(Duration::ZERO).unwrap_err();
    assert_eq!(err.kind(), "config_error");
    assert!(!coordinator.is_running());
}

// ── Test 7: one failing resource does not block the others ──
#[tokio::test(start_paused = true)]
async fn test_failed_fetch_is_isolated() {
    let fetcher = Arc::new(CountingFetcher::failing(ResourceKind::Coins));
    let (cache, coordinator) = setup(fetcher.clone(), DEDUP);

    coordinator.refresh_all().await;
    let snap = cache.settled_all().await;

    let coins = snap.state(ResourceKind::Coins);
    assert!(coins.data.is_none());
    assert!(coins.error.as_deref().unwrap_or_default().contains("503"));
    assert_eq!(PanelStatus::of(coins), PanelStatus::Failed { message: "failed to load".into() });

    assert!(snap.signals().is_some());
    assert!(snap.state(ResourceKind::Signals).error.is_none());
    assert!(PanelStatus::of(snap.state(ResourceKind::Signals)).is_ready());

    // No automatic retry.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(fetcher.calls(ResourceKind::Coins), 1);
    assert_eq!(cache.fetch_counts(ResourceKind::Coins), (0, 1));
}

// ── Test 8: a failed re-fetch keeps the last good document ──
#[tokio::test(start_paused = true)]
async fn test_failed_refetch_keeps_stale_data() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);

    coordinator.refresh(ResourceKind::Coins);
    let first = cache.settled(ResourceKind::Coins).await;
    assert_eq!(first.coins().map(|c| c.coins.len()), Some(1));

    fetcher.fail_after_first.store(true, Ordering::SeqCst);
    coordinator.refresh(ResourceKind::Coins);
    let second = cache.settled(ResourceKind::Coins).await;

    assert!(second.version > first.version);
    assert_eq!(second.coins().map(|c| c.coins.len()), Some(1));
    assert!(second.error.is_some());
    assert_eq!(PanelStatus::of(&second), PanelStatus::Ready { stale: true });
}

// ── Test 9: cancelled listeners stop refreshing ──
#[tokio::test(start_paused = true)]
async fn test_cancelled_listener_stops_refreshing() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);
    let signals = LifecycleSignals::new();

    let handle = coordinator.on_focus_regained(&signals);
    assert_eq!(handle.event(), LifecycleEvent::FocusRegained);
    assert!(handle.is_active());

    signals.emit(LifecycleEvent::FocusRegained);
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.settled_all().await;
    assert_eq!(coordinator.stats().focus_batches, 1);

    handle.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;
    signals.emit(LifecycleEvent::FocusRegained);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(coordinator.stats().focus_batches, 1);
    assert_eq!(fetcher.total(), 5);
}

// ── Test 10: listeners react only to their own event ──
#[tokio::test(start_paused = true)]
async fn test_connectivity_listener_ignores_focus() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);
    let signals = LifecycleSignals::new();
    let _online = coordinator.on_connectivity_restored(&signals);

    signals.emit(LifecycleEvent::FocusRegained);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.total(), 0);

    signals.emit(LifecycleEvent::ConnectivityRestored);
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.settled_all().await;

    let stats = coordinator.stats();
    assert_eq!(stats.connectivity_batches, 1);
    assert_eq!(stats.focus_batches, 0);
    assert_eq!(fetcher.total(), 5);
}

// ── Test 11: refresh_one by name ──
#[tokio::test(start_paused = true)]
async fn test_refresh_one_by_name() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), DEDUP);

    assert_eq!(coordinator.refresh_one("smc-pa").unwrap(), Invalidation::Issued);
    assert_eq!(coordinator.refresh_one("smc_pa").unwrap(), Invalidation::Deduplicated);
    assert!(matches!(
        coordinator.refresh_one("portfolio"),
        Err(DashError::UnknownResource(name)) if name == "portfolio"
    ));

    cache.settled(ResourceKind::SmcPa).await;
    assert_eq!(fetcher.calls(ResourceKind::SmcPa), 1);
    assert_eq!(fetcher.total(), 1);
}

// ── Test 12: change subscriptions ──
#[tokio::test(start_paused = true)]
async fn test_subscribers_notified_until_unsubscribed() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, coordinator) = setup(fetcher.clone(), Duration::ZERO);

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let listener: ChangeListener = Arc::new(move |kind: ResourceKind, state: &ResourceState| {
        assert_eq!(kind, ResourceKind::Alarms);
        assert!(!state.loading);
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let sub = cache.subscribe(ResourceKind::Alarms, listener);
    assert_eq!(sub.key(), ResourceKind::Alarms);

    coordinator.refresh_all().await;
    cache.settled_all().await;
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    sub.unsubscribe();
    coordinator.refresh(ResourceKind::Alarms);
    cache.settled(ResourceKind::Alarms).await;
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

// ── Test 13: dashboard wiring over the synthetic market ──
#[tokio::test(start_paused = true)]
async fn test_dashboard_launch_loads_every_panel() {
    let mut config = DashConfig::from_env();
    config.refresh_interval = Duration::from_secs(300);
    config.dedup_window = DEDUP;

    let fetcher = SyntheticFetcher::new(MarketGenerator::with_seed(42)).with_latency(Duration::from_millis(20));
    let mut dash = Dashboard::with_fetcher(Arc::new(fetcher), &config);

    let report = dash.launch(&config).await.unwrap();
    assert_eq!(report.issued.len(), 5);
    assert!(dash.coordinator.is_running());
    assert_eq!(dash.signals.listener_count(), 2);

    let snap = dash.cache.settled_all().await;
    for kind in ResourceKind::ALL {
        assert!(PanelStatus::of(snap.state(kind)).is_ready(), "{kind} not ready");
    }

    dash.signals.emit(LifecycleEvent::FocusRegained);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(dash.coordinator.stats().fetches_deduplicated, 5);

    dash.shutdown();
    assert!(!dash.coordinator.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_synthetic_outage_surfaces_per_panel() {
    let fetcher = SyntheticFetcher::new(MarketGenerator::with_seed(1)).failing(ResourceKind::Ohlcv);
    let cache = DocumentCache::new(Arc::new(fetcher), DEDUP);
    let coordinator = RefreshCoordinator::new(Arc::new(cache.clone()));

    coordinator.refresh_all().await;
    let snap = cache.settled_all().await;
    assert!(matches!(PanelStatus::of(snap.state(ResourceKind::Ohlcv)), PanelStatus::Failed { .. }));
    assert!(snap.coins().is_some_and(|c| !c.coins.is_empty()));
}

// ── Test 14: a new fetch never starts before the previous one publishes ──
// Runs on worker threads so completions race the invalidations.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_issued_fetch_is_visible_as_loading() {
    let fetcher = Arc::new(CountingFetcher::new());
    let (cache, _coordinator) = setup(fetcher.clone(), Duration::ZERO);
    let kind = ResourceKind::Coins;

    let mut issued = 0u64;
    for _ in 0..20_000 {
        if cache.invalidate(kind) == Invalidation::Issued {
            issued += 1;
            let state = cache.get(kind);
            assert!(
                state.loading || state.version >= issued,
                "fetch {issued} issued but slot shows loading=false at version {}",
                state.version
            );
        }
        tokio::task::yield_now().await;
    }

    let state = cache.settled(kind).await;
    assert!(issued > 1);
    assert_eq!(state.version, issued);
    assert_eq!(fetcher.calls(kind) as u64, issued);
}
