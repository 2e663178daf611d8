//! Panel projections: pure functions from the latest documents to what a
//! panel displays. Panels never share state with each other.

pub mod alarms;
pub mod analysis;
pub mod chart;
pub mod coins;
pub mod rsi;
pub mod signals;
pub mod smc;

use serde::Serialize;

use crate::cache::ResourceState;

pub const FAILED_TO_LOAD: &str = "failed to load";

/// What a panel should show for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelStatus {
    Loading,
    Failed { message: String },
    Ready { stale: bool },
}

impl PanelStatus {
    pub fn of(state: &ResourceState) -> Self {
        match (&state.data, &state.error) {
            (Some(_), err) => PanelStatus::Ready { stale: err.is_some() },
            (None, Some(_)) => PanelStatus::Failed {
                message: FAILED_TO_LOAD.to_string(),
            },
            // Nothing fetched yet, whether or not a fetch has started.
            (None, None) => PanelStatus::Loading,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PanelStatus::Ready { .. })
    }
}

/// Case-insensitive substring match; an empty query matches everything.
pub fn symbol_matches(symbol: &str, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || symbol.to_lowercase().contains(&query.to_lowercase())
}

/// "BTCUSDT" → "BTC".
pub fn display_symbol(symbol: &str) -> &str {
    symbol.strip_suffix("USDT").filter(|s| !s.is_empty()).unwrap_or(symbol)
}

/// Sub-dollar prices need more precision to be readable.
pub fn format_price(price: f64) -> String {
    if price < 1.0 {
        format!("{price:.6}")
    } else {
        format!("{price:.2}")
    }
}

pub fn format_change(pct: f64) -> String {
    if pct > 0.0 {
        format!("+{pct:.2}%")
    } else {
        format!("{pct:.2}%")
    }
}

/// Compact notation with one fractional digit: 1.2K, 3.4M, 5.6B.
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    let text = format!("{scaled:.1}");
    let text = text.strip_suffix(".0").unwrap_or(&text);
    format!("{text}{suffix}")
}
