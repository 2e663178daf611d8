use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::DashError;
use crate::resource::ResourceKind;

pub const DEFAULT_BASE_URL: &str =
    "https://muwqydzmponlsoagasnw.supabase.co/storage/v1/object/public/signals";
pub const DEFAULT_SMC_BASE_URL: &str =
    "https://muwqydzmponlsoagasnw.supabase.co/storage/v1/object/public/margingate";

/// Files making up the SMC-PA dataset, relative to the SMC bucket.
pub const SMC_ALARM_2H: &str = "alarm_2h.json";
pub const SMC_ALARM_4H: &str = "alarm_4h.json";
pub const SMC_ENTRY_LONG: &str = "entry_long_signals.json";
pub const SMC_ENTRY_SHORT: &str = "entry_short_signals.json";
pub const SMC_SUMMARY: &str = "sonuc.json";

/// Some deployments keep the SMC files under a folder named after the bucket.
pub const SMC_NESTED_PREFIX: &str = "margingate";

/// Where the remote documents live.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub base_url: String,
    pub smc_base_url: String,
    pub language: String,
}

impl Endpoints {
    pub fn new(base_url: &str, smc_base_url: &str, language: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            smc_base_url: smc_base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        }
    }

    /// The coin list is not localised.
    pub fn coins_url(&self) -> String {
        format!("{}/coins.json", self.base_url)
    }

    pub fn signals_url(&self) -> String {
        format!("{}/signals_{}.json", self.base_url, self.language)
    }

    pub fn alarms_url(&self) -> String {
        format!("{}/alarm_{}.json", self.base_url, self.language)
    }

    pub fn ohlcv_url(&self) -> String {
        format!("{}/ohlcv_data_{}.json", self.base_url, self.language)
    }

    /// Candidate URLs for one SMC-PA file: bucket root first, then nested.
    pub fn smc_urls(&self, file: &str) -> [String; 2] {
        [
            format!("{}/{}", self.smc_base_url, file),
            format!("{}/{}/{}", self.smc_base_url, SMC_NESTED_PREFIX, file),
        ]
    }

    /// Primary document URL for a resource kind.
    pub fn url_for(&self, kind: ResourceKind) -> String {
        match kind {
            ResourceKind::Alarms => self.alarms_url(),
            ResourceKind::Signals => self.signals_url(),
            ResourceKind::Coins => self.coins_url(),
            ResourceKind::Ohlcv => self.ohlcv_url(),
            ResourceKind::SmcPa => self.smc_urls(SMC_SUMMARY)[0].clone(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_SMC_BASE_URL, "en")
    }
}

/// Dashboard configuration derived from `MG_*` environment variables.
/// CLI flags override individual fields after loading.
#[derive(Debug, Clone)]
pub struct DashConfig {
    pub endpoints: Endpoints,

    // ── Refresh ────────────────────────────────────────────────────
    pub refresh_interval: Duration,
    pub dedup_window: Duration,
    pub request_timeout: Duration,
    pub probe_interval: Duration,

    // ── Web ────────────────────────────────────────────────────────
    pub bind: String,
    pub port: u16,
    /// Bearer token for the web API.  Empty ⇒ auth disabled.
    pub token: String,
    pub static_dir: PathBuf,

    // ── Local state ────────────────────────────────────────────────
    pub theme_file: PathBuf,
    pub log_file: PathBuf,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    PathBuf::from(env_str(name, default))
}

fn default_state_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_STATE_HOME") {
        let xdg = xdg.trim();
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("margingate-dash");
        }
    }
    if let Ok(home) = env::var("HOME") {
        let home = home.trim();
        if !home.is_empty() {
            return PathBuf::from(home).join(".local/state/margingate-dash");
        }
    }
    PathBuf::from(".margingate-dash")
}

impl DashConfig {
    pub fn from_env() -> Self {
        let state_dir = default_state_dir();
        let theme_default = state_dir.join("theme");
        let log_default = state_dir.join("dashboard.log");

        Self {
            endpoints: Endpoints::new(
                &env_str("MG_BASE_URL", DEFAULT_BASE_URL),
                &env_str("MG_SMC_BASE_URL", DEFAULT_SMC_BASE_URL),
                &env_str("MG_LANG", "en"),
            ),
            refresh_interval: Duration::from_millis(env_u64("MG_REFRESH_MS", 300_000)),
            dedup_window: Duration::from_millis(env_u64("MG_DEDUP_MS", 60_000)),
            request_timeout: Duration::from_millis(env_u64("MG_REQUEST_TIMEOUT_MS", 15_000)),
            probe_interval: Duration::from_millis(env_u64("MG_PROBE_MS", 15_000)),
            bind: env_str("MG_BIND", "127.0.0.1"),
            port: env_u16("MG_PORT", 3000),
            token: env_str("MG_TOKEN", ""),
            static_dir: env_path("MG_STATIC_DIR", "static"),
            theme_file: env_path("MG_THEME_FILE", theme_default.to_str().unwrap_or("theme")),
            log_file: env_path("MG_LOG_FILE", log_default.to_str().unwrap_or("dashboard.log")),
        }
    }

    /// Reject values the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), DashError> {
        if self.refresh_interval.is_zero() {
            return Err(DashError::Config("refresh interval must be positive".into()));
        }
        if self.probe_interval.is_zero() {
            return Err(DashError::Config("probe interval must be positive".into()));
        }
        if self.endpoints.language.is_empty() {
            return Err(DashError::Config("language must not be empty".into()));
        }
        Ok(())
    }
}
