use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::alarms::{alarm_card, AlarmCard};
use super::chart::{recent_closes, ChartPoint};
use super::signals::{signal_totals, SignalTotals};
use super::symbol_matches;
use crate::types::{AlarmsDoc, Coin, CoinsDoc, Interval, OhlcvDoc, SignalBundle, SignalsDoc};

pub const ANALYSIS_CHART_POINTS: usize = 20;

/// Every symbol known to any of the three documents, sorted.
pub fn available_symbols(
    coins: Option<&CoinsDoc>,
    signals: Option<&SignalsDoc>,
    alarms: Option<&AlarmsDoc>,
    query: &str,
) -> Vec<String> {
    let mut set = BTreeSet::new();
    if let Some(s) = signals {
        set.extend(s.signals.keys().cloned());
    }
    if let Some(c) = coins {
        set.extend(c.coins.iter().map(|c| c.symbol.clone()));
    }
    if let Some(a) = alarms {
        set.extend(a.alarms.iter().map(|a| a.symbol.clone()));
    }
    set.into_iter().filter(|s| symbol_matches(s, query)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinDetail {
    pub symbol: String,
    pub coin: Option<Coin>,
    pub signals: BTreeMap<String, SignalBundle>,
    pub totals: SignalTotals,
    pub alarms: Vec<AlarmCard>,
    pub chart: Vec<ChartPoint>,
}

pub fn coin_detail(
    symbol: &str,
    coins: Option<&CoinsDoc>,
    signals: Option<&SignalsDoc>,
    alarms: Option<&AlarmsDoc>,
    ohlcv: Option<&OhlcvDoc>,
) -> CoinDetail {
    let bundles = signals
        .and_then(|s| s.signals.get(symbol))
        .cloned()
        .unwrap_or_default();
    CoinDetail {
        symbol: symbol.to_string(),
        coin: coins.and_then(|c| c.coins.iter().find(|c| c.symbol == symbol).cloned()),
        totals: signal_totals(&bundles),
        signals: bundles,
        alarms: alarms
            .map(|a| {
                a.alarms
                    .iter()
                    .filter(|a| a.symbol == symbol)
                    .map(|a| alarm_card(a, ohlcv))
                    .collect()
            })
            .unwrap_or_default(),
        chart: recent_closes(ohlcv, symbol, Interval::H4, ANALYSIS_CHART_POINTS),
    }
}
