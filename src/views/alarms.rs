use serde::Serialize;

use super::chart::{recent_closes, ChartPoint};
use super::{display_symbol, symbol_matches};
use crate::types::{Alarm, AlarmDetail, AlarmSide, AlarmsDoc, BreakDirection, Interval, OhlcvDoc};

pub const ALARM_CHART_POINTS: usize = 15;
pub const DEFAULT_ALARM_INTERVAL: Interval = Interval::H4;

const LONG_PULLBACK_RULE: &str = "BOS_up equilibrium";
const SHORT_WEAKNESS_RULE: &str = "4h BOS_up + 30m last 20 CHoCH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmFilter {
    /// `None` shows both sides.
    pub side: Option<AlarmSide>,
    pub query: String,
}

impl AlarmFilter {
    pub fn matches(&self, alarm: &Alarm) -> bool {
        self.side.map_or(true, |side| alarm.side == side) && symbol_matches(&alarm.symbol, &self.query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceAction {
    pub title: String,
    pub description: String,
    pub strategy: String,
    pub risk: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    Near,
    Approaching,
    Distant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmCard {
    pub side: AlarmSide,
    pub symbol: String,
    pub display: String,
    pub interval: Interval,
    pub rule: String,
    pub current_price: Option<f64>,
    pub proximity: Option<Proximity>,
    pub price_action: PriceAction,
    pub chart: Vec<ChartPoint>,
}

fn level(v: Option<f64>) -> String {
    v.map_or_else(|| "?".to_string(), |v| v.to_string())
}

/// Translate a machine rule into a readable setup description.
pub fn price_action(alarm: &Alarm) -> PriceAction {
    match (alarm.side, &alarm.detail) {
        (AlarmSide::Long, AlarmDetail::Levels { bos_level, dip_price, alarm_level, .. })
            if alarm.rule.contains(LONG_PULLBACK_RULE) =>
        {
            let interval = alarm.interval.as_deref().unwrap_or(DEFAULT_ALARM_INTERVAL.as_str());
            PriceAction {
                title: "Uptrend Pullback".to_string(),
                description: format!(
                    "Price broke an important resistance level ({}) in {} timeframe and is currently retracing to this level. Support level formed around {}.",
                    level(*bos_level),
                    interval,
                    level(*dip_price),
                ),
                strategy: format!(
                    "LONG position can be opened when price breaks above {} level. This would be a strong signal for trend continuation.",
                    level(*alarm_level),
                ),
                risk: format!("Stop loss should be placed below {} level.", level(*dip_price)),
                target: format!("First target could be retesting the {} level.", level(*bos_level)),
            }
        }
        (AlarmSide::Short, AlarmDetail::Structural { bos_4h, choc_30m, .. })
            if alarm.rule.contains(SHORT_WEAKNESS_RULE) =>
        {
            let first = choc_30m.first();
            let flipped = first.is_some_and(|c| {
                c.from == label_of(BreakDirection::Up) && c.to == label_of(BreakDirection::Down)
            });
            PriceAction {
                title: "Trend Weakness and Bearish Signal".to_string(),
                description: format!(
                    "Price broke {} level in 4h timeframe but trend character changed in 30m chart. {} is observed.",
                    bos_4h.level,
                    if flipped { "Transition from bullish to bearish" } else { "Momentum change" },
                ),
                strategy: format!(
                    "Break below {} level in 30m chart gives strong signal for SHORT position.",
                    level(first.map(|c| c.level)),
                ),
                risk: format!("Stop loss should be above 4h BOS level {}.", bos_4h.level),
                target: "First target should be sought at 30m support levels.".to_string(),
            }
        }
        _ => PriceAction {
            title: "Technical Analysis Signal".to_string(),
            description: alarm.rule.clone(),
            strategy: format!("Opportunity can be evaluated for {} position.", alarm.side.label()),
            risk: "Proper risk management is required.".to_string(),
            target: "Target levels should be determined according to technical analysis.".to_string(),
        },
    }
}

fn label_of(dir: BreakDirection) -> &'static str {
    match dir {
        BreakDirection::Up => "BOS_up",
        BreakDirection::Down => "BOS_down",
    }
}

/// Distance of the current price from the alarm level, LONG alarms only.
pub fn proximity(alarm: &Alarm) -> Option<Proximity> {
    if alarm.side != AlarmSide::Long {
        return None;
    }
    let (current, target) = (alarm.current_price()?, alarm.alarm_level()?);
    if current == 0.0 || target == 0.0 {
        return None;
    }
    let distance = (current - target).abs() / target * 100.0;
    Some(if distance < 1.0 {
        Proximity::Near
    } else if distance < 3.0 {
        Proximity::Approaching
    } else {
        Proximity::Distant
    })
}

pub fn alarm_card(alarm: &Alarm, ohlcv: Option<&OhlcvDoc>) -> AlarmCard {
    let interval = alarm.parsed_interval().unwrap_or(DEFAULT_ALARM_INTERVAL);
    AlarmCard {
        side: alarm.side,
        symbol: alarm.symbol.clone(),
        display: display_symbol(&alarm.symbol).to_string(),
        interval,
        rule: alarm.rule.clone(),
        current_price: alarm.current_price(),
        proximity: proximity(alarm),
        price_action: price_action(alarm),
        chart: recent_closes(ohlcv, &alarm.symbol, interval, ALARM_CHART_POINTS),
    }
}

/// Cards for every alarm passing `filter`, in producer order.
pub fn alarm_cards(alarms: &AlarmsDoc, ohlcv: Option<&OhlcvDoc>, filter: &AlarmFilter) -> Vec<AlarmCard> {
    alarms
        .alarms
        .iter()
        .filter(|a| filter.matches(a))
        .map(|a| alarm_card(a, ohlcv))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SideCounts {
    pub long: usize,
    pub short: usize,
}

pub fn side_counts(alarms: &AlarmsDoc) -> SideCounts {
    alarms.alarms.iter().fold(SideCounts::default(), |mut acc, a| {
        match a.side {
            AlarmSide::Long => acc.long += 1,
            AlarmSide::Short => acc.short += 1,
        }
        acc
    })
}
