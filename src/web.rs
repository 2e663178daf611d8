use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path as UrlPath, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::cache::{ChangeListener, DocumentCache, ResourceCache, ResourceState, Subscription};
use crate::config::DashConfig;
use crate::coordinator::{RefreshCoordinator, RefreshStats};
use crate::dashboard::Dashboard;
use crate::error::DashError;
use crate::latency::LatencyStats;
use crate::lifecycle::{LifecycleEvent, LifecycleSignals};
use crate::resource::ResourceKind;
use crate::types::{AlarmSide, Interval, ShortCombo};
use crate::views::alarms::{alarm_cards, AlarmCard, AlarmFilter};
use crate::views::analysis::{available_symbols, coin_detail, CoinDetail};
use crate::views::coins::{coin_cards, CoinCard, COIN_LIMIT};
use crate::views::rsi::{rsi_points, rsi_rows, rsi_stats, RsiPoint, RsiRow, RsiStats};
use crate::views::signals::{signal_cards, SignalCard};
use crate::views::smc::{overview, short_entries_for, SmcOverview};
use crate::views::PanelStatus;

pub struct AppState {
    pub cache: DocumentCache,
    pub coordinator: RefreshCoordinator,
    pub signals: LifecycleSignals,
    pub tx: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(dash: &Dashboard) -> Self {
        Self {
            cache: dash.cache.clone(),
            coordinator: dash.coordinator.clone(),
            signals: dash.signals.clone(),
            tx: broadcast::channel(256).0,
        }
    }
}

// ── Auth ──

/// Bearer token injected into every request; empty disables auth.
#[derive(Clone)]
pub struct AuthToken(pub String);

pub async fn require_auth(request: Request, next: Next) -> Response {
    let token = request
        .extensions()
        .get::<AuthToken>()
        .map(|t| t.0.clone())
        .unwrap_or_default();
    if token.is_empty() {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let expected = format!("Bearer {token}");
    if constant_time_eq(header.as_bytes(), expected.as_bytes()) {
        return next.run(request).await;
    }
    DashError::AuthRequired.into_response()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Wire types ──

#[derive(Debug, Clone, Serialize)]
pub struct ResourceSummary {
    pub kind: ResourceKind,
    #[serde(flatten)]
    pub status: PanelStatus,
    pub loading: bool,
    pub version: u64,
    pub entries: usize,
    pub last_update: Option<String>,
    pub fetched_at: Option<String>,
    pub error: Option<String>,
}

impl ResourceSummary {
    pub fn of(kind: ResourceKind, state: &ResourceState) -> Self {
        Self {
            kind,
            status: PanelStatus::of(state),
            loading: state.loading,
            version: state.version,
            entries: state.data.as_ref().map_or(0, |d| d.len()),
            last_update: state.data.as_ref().and_then(|d| d.last_update().map(str::to_string)),
            fetched_at: state.fetched_at.map(|t| t.to_rfc3339()),
            error: state.error.clone(),
        }
    }
}

#[derive(Serialize)]
struct ResourceHealth {
    #[serde(flatten)]
    summary: ResourceSummary,
    latency: LatencyStats,
    fetches_ok: u64,
    fetches_failed: u64,
}

#[derive(Serialize)]
struct DashboardState {
    auto_refresh: bool,
    interval_secs: Option<f64>,
    stats: RefreshStats,
    resources: Vec<ResourceHealth>,
}

/// A panel payload: its load status plus the projected items once ready.
#[derive(Serialize)]
struct Panel<T: Serialize> {
    #[serde(flatten)]
    status: PanelStatus,
    items: Option<T>,
}

impl<T: Serialize> Panel<T> {
    fn new(state: &ResourceState, items: Option<T>) -> Json<Self> {
        Json(Self { status: PanelStatus::of(state), items })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
    pub side: Option<String>,
    pub tf: Option<String>,
}

impl ListQuery {
    fn interval_or(&self, default: Interval) -> Interval {
        self.tf.as_deref().and_then(|s| s.parse().ok()).unwrap_or(default)
    }

    /// "all", empty or unrecognised sides show everything.
    fn side(&self) -> Option<AlarmSide> {
        self.side.as_deref().and_then(|s| s.parse().ok())
    }
}

// ── Router ──

pub fn router(state: Arc<AppState>, static_dir: &Path, token: &str) -> Router {
    let api = Router::new()
        .route("/api/state", get(dashboard_state))
        .route("/api/coins", get(coins))
        .route("/api/signals", get(signals))
        .route("/api/alarms", get(alarms))
        .route("/api/rsi", get(rsi))
        .route("/api/symbols", get(symbols))
        .route("/api/analysis/:symbol", get(analysis))
        .route("/api/smc", get(smc))
        .route("/api/refresh", post(refresh_all))
        .route("/api/refresh/:kind", post(refresh_one))
        .route("/api/lifecycle/:event", post(lifecycle))
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn(require_auth))
        .layer(Extension(AuthToken(token.to_string())));

    Router::new()
        .merge(api)
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Push a summary line to every websocket client whenever a resource changes.
pub fn forward_changes(cache: &DocumentCache, tx: broadcast::Sender<String>) -> Vec<Subscription> {
    ResourceKind::ALL
        .iter()
        .map(|kind| {
            let tx = tx.clone();
            let listener: ChangeListener = Arc::new(move |kind: ResourceKind, state: &ResourceState| {
                let msg = json!({ "type": "resource", "data": ResourceSummary::of(kind, state) });
                // No receivers just means no client is connected.
                let _ = tx.send(msg.to_string());
            });
            cache.subscribe(*kind, listener)
        })
        .collect()
}

pub async fn run(mut dash: Dashboard, config: DashConfig, duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&dash));
    let _subscriptions = forward_changes(&state.cache, state.tx.clone());

    let report = dash.launch(&config).await?;
    tracing::info!(issued = report.issued.len(), "initial load started");

    let app = router(Arc::clone(&state), &config.static_dir, &config.token);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("dashboard at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(duration))
        .await?;

    dash.shutdown();
    Ok(())
}

async fn shutdown_signal(duration: u64) {
    let deadline = async {
        if duration == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(duration)).await;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        _ = deadline => tracing::info!(secs = duration, "run duration elapsed"),
    }
}

// ── Handlers ──

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn dashboard_state(State(state): State<Arc<AppState>>) -> Json<DashboardState> {
    let cache = &state.cache;
    let resources = ResourceKind::ALL
        .iter()
        .map(|kind| {
            let (ok, failed) = cache.fetch_counts(*kind);
            ResourceHealth {
                summary: ResourceSummary::of(*kind, &cache.get(*kind)),
                latency: cache.latency(*kind),
                fetches_ok: ok,
                fetches_failed: failed,
            }
        })
        .collect();
    Json(DashboardState {
        auto_refresh: state.coordinator.is_running(),
        interval_secs: state.coordinator.interval().map(|d| d.as_secs_f64()),
        stats: state.coordinator.stats(),
        resources,
    })
}

async fn coins(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> impl IntoResponse {
    let snap = state.cache.snapshot();
    let limit = q.limit.unwrap_or(COIN_LIMIT);
    let items: Option<Vec<CoinCard>> = snap.coins().map(|c| coin_cards(c, snap.ohlcv(), &q.q, limit));
    Panel::new(snap.state(ResourceKind::Coins), items)
}

async fn signals(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> impl IntoResponse {
    let snap = state.cache.snapshot();
    let items: Option<Vec<SignalCard>> = snap.signals().map(|s| signal_cards(s, snap.ohlcv(), &q.q));
    Panel::new(snap.state(ResourceKind::Signals), items)
}

async fn alarms(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> impl IntoResponse {
    let snap = state.cache.snapshot();
    let filter = AlarmFilter { side: q.side(), query: q.q.clone() };
    let items: Option<Vec<AlarmCard>> = snap.alarms().map(|a| alarm_cards(a, snap.ohlcv(), &filter));
    Panel::new(snap.state(ResourceKind::Alarms), items)
}

#[derive(Serialize)]
struct RsiMap {
    timeframe: Interval,
    rows: Vec<RsiRow>,
    points: Vec<RsiPoint>,
    stats: RsiStats,
}

async fn rsi(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> impl IntoResponse {
    let snap = state.cache.snapshot();
    let tf = q.interval_or(Interval::H4);
    let items = snap.signals().map(|s| {
        let rows = rsi_rows(s, &q.q);
        RsiMap { timeframe: tf, points: rsi_points(&rows, tf), stats: rsi_stats(&rows, tf), rows }
    });
    Panel::new(snap.state(ResourceKind::Signals), items)
}

async fn symbols(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> Json<Vec<String>> {
    let snap = state.cache.snapshot();
    Json(available_symbols(snap.coins(), snap.signals(), snap.alarms(), &q.q))
}

async fn analysis(State(state): State<Arc<AppState>>, UrlPath(symbol): UrlPath<String>) -> Json<CoinDetail> {
    let snap = state.cache.snapshot();
    let symbol = symbol.to_uppercase();
    Json(coin_detail(&symbol, snap.coins(), snap.signals(), snap.alarms(), snap.ohlcv()))
}

#[derive(Serialize)]
struct SmcView {
    timeframe: Interval,
    overview: SmcOverview,
    short_entries: Vec<ShortCombo>,
}

async fn smc(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> impl IntoResponse {
    let snap = state.cache.snapshot();
    let tf = q.interval_or(Interval::H4);
    let items = snap.smc().map(|d| SmcView {
        timeframe: tf,
        overview: overview(d),
        short_entries: short_entries_for(d, tf).into_iter().cloned().collect(),
    });
    Panel::new(snap.state(ResourceKind::SmcPa), items)
}

async fn refresh_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.coordinator.refresh_all().await)
}

async fn refresh_one(
    State(state): State<Arc<AppState>>,
    UrlPath(kind): UrlPath<String>,
) -> Result<Json<serde_json::Value>, DashError> {
    let outcome = state.coordinator.refresh_one(&kind)?;
    Ok(Json(json!({ "kind": kind, "outcome": outcome })))
}

async fn lifecycle(
    State(state): State<Arc<AppState>>,
    UrlPath(event): UrlPath<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), DashError> {
    let ev = LifecycleEvent::parse(&event).ok_or_else(|| DashError::UnknownEvent(event.clone()))?;
    let listeners = state.signals.emit(ev);
    Ok((StatusCode::ACCEPTED, Json(json!({ "event": ev.label(), "listeners": listeners }))))
}

// ── WebSocket ──

#[derive(Debug, Deserialize)]
struct ClientMsg {
    #[serde(rename = "type")]
    msg_type: String,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Server pushes resource updates; the page reports focus and connectivity
/// back as `{"type":"focus"}` / `{"type":"online"}`.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.tx.subscribe();

    let forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "websocket client lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let Ok(parsed) = serde_json::from_str::<ClientMsg>(&text) else {
                    continue;
                };
                if let Some(ev) = LifecycleEvent::parse(&parsed.msg_type) {
                    state.signals.emit(ev);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    forward.abort();
}
