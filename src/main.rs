use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use margingate_dash::config::{DashConfig, Endpoints};
use margingate_dash::dashboard::Dashboard;
use margingate_dash::resource::ResourceKind;
use margingate_dash::views::PanelStatus;
use margingate_dash::{tui, web};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Tui,
    Web,
    Headless,
}

#[derive(Parser)]
#[command(name = "margingate-dash", about = "Crypto technical-analysis dashboard")]
struct Cli {
    /// Run mode: tui, web, or headless
    #[arg(long, value_enum, default_value = "tui")]
    mode: Mode,

    /// Web server port (web mode only); overrides MG_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Auto-refresh interval in seconds; overrides MG_REFRESH_MS
    #[arg(long)]
    refresh_secs: Option<u64>,

    /// Document language suffix; overrides MG_LANG
    #[arg(long)]
    lang: Option<String>,

    /// Serve generated market data instead of the remote buckets
    #[arg(long)]
    synthetic: bool,

    /// Run duration in seconds (0 = until interrupted)
    #[arg(long, default_value = "0")]
    duration: u64,
}

impl Cli {
    fn apply(&self, config: &mut DashConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.refresh_secs {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(lang) = &self.lang {
            let ep = &config.endpoints;
            config.endpoints = Endpoints::new(&ep.base_url, &ep.smc_base_url, lang);
        }
    }
}

fn init_tracing(mode: Mode, log_file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if mode == Mode::Tui {
        // The terminal belongs to the UI; logs go to a file instead.
        if let Some(dir) = log_file.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = DashConfig::from_env();
    cli.apply(&mut config);
    init_tracing(cli.mode, &config.log_file)?;

    let dash = Dashboard::from_config(&config, cli.synthetic)?;
    tracing::info!(
        mode = ?cli.mode,
        synthetic = cli.synthetic,
        language = %config.endpoints.language,
        refresh_secs = config.refresh_interval.as_secs_f64(),
        "starting dashboard"
    );

    match cli.mode {
        Mode::Tui => tui::run(dash, config, cli.duration).await?,
        Mode::Web => web::run(dash, config, cli.duration).await?,
        Mode::Headless => run_headless(dash, config, cli.duration).await?,
    }
    Ok(())
}

/// Load everything once, keep refreshing for `duration_secs`, then print a
/// summary of what each panel would show.
async fn run_headless(mut dash: Dashboard, config: DashConfig, duration_secs: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== margingate-dash (headless) ===");
    println!(
        "Refresh: {}s, Duration: {}s",
        config.refresh_interval.as_secs(),
        if duration_secs == 0 { "until loaded".to_string() } else { duration_secs.to_string() }
    );
    println!();

    let start = Instant::now();
    let report = dash.launch(&config).await?;
    println!("  Initial load: {} fetches issued", report.issued.len());

    let snapshot = dash.cache.settled_all().await;
    println!("  Settled in {} ms", start.elapsed().as_millis());

    if duration_secs > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(duration_secs).saturating_sub(start.elapsed())) => {}
            _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
        }
    }
    let snapshot = if duration_secs > 0 { dash.cache.snapshot() } else { snapshot };

    println!();
    println!("=== Resources ===");
    for kind in ResourceKind::ALL {
        let state = snapshot.state(kind);
        let status = match PanelStatus::of(state) {
            PanelStatus::Loading => "loading".to_string(),
            PanelStatus::Failed { message } => message,
            PanelStatus::Ready { stale: false } => "ready".to_string(),
            PanelStatus::Ready { stale: true } => "ready (stale)".to_string(),
        };
        let entries = state.data.as_ref().map_or(0, |d| d.len());
        let updated = state.data.as_ref().and_then(|d| d.last_update().map(str::to_string)).unwrap_or_default();
        println!("  {:<8} {:<16} entries={:<5} updated={}", kind.label(), status, entries, updated);
        if let Some(err) = &state.error {
            println!("           error: {err}");
        }
    }

    println!();
    let stats = dash.coordinator.stats();
    println!("=== Refresh ===");
    println!("  Manual batches:       {}", stats.manual_batches);
    println!("  Timer ticks:          {}", stats.timer_ticks);
    println!("  Focus batches:        {}", stats.focus_batches);
    println!("  Connectivity batches: {}", stats.connectivity_batches);
    println!("  Fetches issued:       {}", stats.fetches_issued);
    println!("  Fetches deduplicated: {}", stats.fetches_deduplicated);
    println!();
    println!("  Fetch latency (ms):");
    for kind in ResourceKind::ALL {
        let lat = dash.cache.latency(kind);
        println!(
            "    {:<8} p50={} p95={} p99={} min={} max={}",
            kind.label(),
            lat.p50_ms,
            lat.p95_ms,
            lat.p99_ms,
            lat.min_ms,
            lat.max_ms
        );
    }

    dash.shutdown();
    Ok(())
}
