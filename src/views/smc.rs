use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{AlarmScan, Interval, RangeAlarm, ShortCombo, ShortSummaryCoin, SmcPaData};

pub const RECENT_ALARM_LIMIT: usize = 8;

/// Timeframes the short-signal breakdown is keyed by.
pub const SMC_TIMEFRAMES: [Interval; 4] = [Interval::H4, Interval::H2, Interval::M30, Interval::M15];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentAlarm {
    pub interval: Interval,
    #[serde(flatten)]
    pub alarm: RangeAlarm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmcOverview {
    pub total_alarms: u64,
    pub recent_alarms: Vec<RecentAlarm>,
    pub long_entry_count: usize,
    pub short_combo_count: usize,
    pub short_by_timeframe: BTreeMap<Interval, Vec<ShortSummaryCoin>>,
    pub short_signal_total: usize,
    pub last_update: Option<String>,
}

pub fn overview(data: &SmcPaData) -> SmcOverview {
    let total_alarms = data.alarm_2h.as_ref().map_or(0, |s| s.total_alarms)
        + data.alarm_4h.as_ref().map_or(0, |s| s.total_alarms);

    let tagged = |scan: &Option<AlarmScan>, interval: Interval| {
        scan.iter()
            .flat_map(|s| s.alarms.iter())
            .map(move |a| RecentAlarm { interval, alarm: a.clone() })
            .collect::<Vec<_>>()
    };
    let recent_alarms = tagged(&data.alarm_4h, Interval::H4)
        .into_iter()
        .chain(tagged(&data.alarm_2h, Interval::H2))
        .take(RECENT_ALARM_LIMIT)
        .collect();

    let short_by_timeframe = short_coins_by_timeframe(data);
    let short_signal_total = short_by_timeframe.values().map(Vec::len).sum();

    SmcOverview {
        total_alarms,
        recent_alarms,
        long_entry_count: data.entry_long.as_ref().map_or(0, |d| d.active_signals.len()),
        short_combo_count: data.entry_short.as_ref().map_or(0, |d| d.active_signals.len()),
        short_by_timeframe,
        short_signal_total,
        last_update: data.last_update.clone(),
    }
}

/// Group summary short coins: 4h/2h by their listed timeframes, 30m/15m by
/// the presence of a CHoCH level. A coin may appear under several keys.
pub fn short_coins_by_timeframe(data: &SmcPaData) -> BTreeMap<Interval, Vec<ShortSummaryCoin>> {
    let mut out: BTreeMap<Interval, Vec<ShortSummaryCoin>> = BTreeMap::new();
    let Some(summary) = &data.summary else {
        return out;
    };
    for coin in &summary.short_signals.coins {
        for tf in [Interval::H4, Interval::H2] {
            if coin.timeframes.iter().any(|t| t == tf.as_str()) {
                out.entry(tf).or_default().push(coin.clone());
            }
        }
        if coin.choch_30m.is_some() {
            out.entry(Interval::M30).or_default().push(coin.clone());
        }
        if coin.choch_15m.is_some() {
            out.entry(Interval::M15).or_default().push(coin.clone());
        }
    }
    out
}

/// Short combo entries relevant to `tf`. Other timeframes pass everything.
pub fn short_entries_for(data: &SmcPaData, tf: Interval) -> Vec<&ShortCombo> {
    let Some(doc) = &data.entry_short else {
        return Vec::new();
    };
    doc.active_signals
        .iter()
        .filter(|s| match tf {
            Interval::H4 | Interval::H2 => s.above_range_timeframes.iter().any(|t| t == tf.as_str()),
            Interval::M30 => s.signal_30m.is_some(),
            Interval::M15 => s.signal_15m.is_some(),
            _ => true,
        })
        .collect()
}
