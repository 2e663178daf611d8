use serde::Serialize;

use super::chart::{recent_closes, ChartPoint};
use super::{display_symbol, symbol_matches};
use crate::types::{CoinsDoc, Interval, OhlcvDoc};

pub const COIN_LIMIT: usize = 20;
pub const COIN_CHART_INTERVAL: Interval = Interval::H4;
pub const COIN_CHART_POINTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinCard {
    pub symbol: String,
    pub display: String,
    pub last_price: f64,
    pub change_pct: f64,
    pub volume: f64,
    pub trend: Trend,
    pub chart: Vec<ChartPoint>,
}

/// Filtered coin cards in producer order, capped at `limit`.
pub fn coin_cards(coins: &CoinsDoc, ohlcv: Option<&OhlcvDoc>, query: &str, limit: usize) -> Vec<CoinCard> {
    coins
        .coins
        .iter()
        .filter(|c| symbol_matches(&c.symbol, query))
        .take(limit)
        .map(|c| CoinCard {
            symbol: c.symbol.clone(),
            display: display_symbol(&c.symbol).to_string(),
            last_price: c.last_price,
            change_pct: c.price_change_percent,
            volume: c.volume,
            trend: if c.price_change_percent > 0.0 { Trend::Up } else { Trend::Down },
            chart: recent_closes(ohlcv, &c.symbol, COIN_CHART_INTERVAL, COIN_CHART_POINTS),
        })
        .collect()
}
