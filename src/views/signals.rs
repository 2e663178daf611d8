use std::collections::BTreeMap;

use serde::Serialize;

use super::chart::{recent_closes, ChartPoint};
use super::rsi::RsiStatus;
use super::{display_symbol, symbol_matches};
use crate::types::{Interval, OhlcvDoc, SignalBundle, SignalsDoc};

/// Interval tabs offered in the detail view, highest timeframe first.
pub const DETAIL_INTERVALS: [Interval; 6] = [
    Interval::H4,
    Interval::H2,
    Interval::H1,
    Interval::M30,
    Interval::M15,
    Interval::M5,
];

pub const CARD_CHART_POINTS: usize = 15;
pub const DETAIL_CHART_POINTS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalTotals {
    pub fvg: usize,
    pub bos: usize,
    pub choch: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalCard {
    pub symbol: String,
    pub display: String,
    pub interval_count: usize,
    pub has_30m: bool,
    pub has_4h: bool,
    pub totals: SignalTotals,
    pub rsi_4h: Option<f64>,
    pub rsi_4h_status: Option<RsiStatus>,
    pub chart: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalDetail {
    pub symbol: String,
    pub interval: Interval,
    pub bundle: SignalBundle,
    pub rsi_status: Option<RsiStatus>,
    pub chart: Vec<ChartPoint>,
}

pub fn signal_totals(intervals: &BTreeMap<String, SignalBundle>) -> SignalTotals {
    intervals.values().fold(SignalTotals::default(), |acc, b| SignalTotals {
        fvg: acc.fvg + b.fvg.len(),
        bos: acc.bos + b.bos.len(),
        choch: acc.choch + b.choch.len(),
    })
}

/// One card per symbol, in symbol order.
pub fn signal_cards(signals: &SignalsDoc, ohlcv: Option<&OhlcvDoc>, query: &str) -> Vec<SignalCard> {
    signals
        .signals
        .iter()
        .filter(|(symbol, _)| symbol_matches(symbol, query))
        .map(|(symbol, intervals)| {
            let rsi_4h = intervals.get(Interval::H4.as_str()).and_then(|b| b.rsi);
            SignalCard {
                symbol: symbol.clone(),
                display: display_symbol(symbol).to_string(),
                interval_count: intervals.len(),
                has_30m: intervals.contains_key(Interval::M30.as_str()),
                has_4h: intervals.contains_key(Interval::H4.as_str()),
                totals: signal_totals(intervals),
                rsi_4h,
                rsi_4h_status: rsi_4h.map(RsiStatus::classify),
                chart: recent_closes(ohlcv, symbol, Interval::H4, CARD_CHART_POINTS),
            }
        })
        .collect()
}

/// Expanded view of one (symbol, interval) bundle.
pub fn interval_detail(
    signals: &SignalsDoc,
    ohlcv: Option<&OhlcvDoc>,
    symbol: &str,
    interval: Interval,
) -> Option<IntervalDetail> {
    let bundle = signals.bundle(symbol, interval)?;
    Some(IntervalDetail {
        symbol: symbol.to_string(),
        interval,
        bundle: bundle.clone(),
        rsi_status: bundle.rsi.map(RsiStatus::classify),
        chart: recent_closes(ohlcv, symbol, interval, DETAIL_CHART_POINTS),
    })
}
