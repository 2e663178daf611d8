use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DashError;

// ── Intervals ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    pub const ALL: [Interval; 8] = [
        Interval::M1,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H2,
        Interval::H4,
        Interval::D1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }

    pub fn millis(&self) -> i64 {
        match self {
            Interval::M1 => 60_000,
            Interval::M5 => 300_000,
            Interval::M15 => 900_000,
            Interval::M30 => 1_800_000,
            Interval::H1 => 3_600_000,
            Interval::H2 => 7_200_000,
            Interval::H4 => 14_400_000,
            Interval::D1 => 86_400_000,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .copied()
            .find(|iv| iv.as_str() == s.trim())
            .ok_or_else(|| DashError::Decode(format!("unknown interval '{s}'")))
    }
}

// ── Lenient decoding ──
//
// The producer is a batch job that writes `null` for empty values and may
// emit partial records. One bad record drops only itself; collections accept
// `null`; only a wrong top-level shape fails a document.

/// One element that either decodes as `T` or is skipped.
#[derive(Deserialize)]
#[serde(untagged)]
enum Entry<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> Entry<T> {
    fn into_valid(self) -> Option<T> {
        match self {
            Entry::Valid(v) => Some(v),
            Entry::Invalid(_) => None,
        }
    }
}

/// `null` decodes as the type's default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Sequence that drops elements which fail to decode. `null` is empty.
fn skip_invalid<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<Vec<Entry<T>>> = Option::deserialize(d)?;
    let raw = raw.unwrap_or_default();
    let total = raw.len();
    let kept: Vec<T> = raw.into_iter().filter_map(Entry::into_valid).collect();
    if kept.len() < total {
        tracing::debug!(dropped = total - kept.len(), "skipped malformed records");
    }
    Ok(kept)
}

/// Optional value where a malformed payload counts as absent.
fn lenient_option<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw: Option<Entry<T>> = Option::deserialize(d)?;
    Ok(raw.and_then(Entry::into_valid))
}

/// symbol → interval key → value, dropping symbols or intervals whose value
/// does not decode.
fn nested_map<'de, D, V>(d: D) -> Result<BTreeMap<String, BTreeMap<String, V>>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw: Option<BTreeMap<String, Entry<BTreeMap<String, Entry<V>>>>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(symbol, by_iv)| {
            let by_iv = by_iv
                .into_valid()?
                .into_iter()
                .filter_map(|(iv, v)| v.into_valid().map(|v| (iv, v)))
                .collect();
            Some((symbol, by_iv))
        })
        .collect())
}

/// A record list decoded with [`skip_invalid`], for use inside maps.
struct Records<T>(Vec<T>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Records<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        skip_invalid(d).map(Records)
    }
}

// ── Coins ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub symbol: String,
    #[serde(rename = "lastPrice", default)]
    pub last_price: f64,
    #[serde(rename = "priceChangePercent", default)]
    pub price_change_percent: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinsDoc {
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub coins: Vec<Coin>,
}

// ── Candles ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

/// symbol → interval key → candles, in producer order.
pub type CandleMap = BTreeMap<String, BTreeMap<String, Vec<Candle>>>;

fn candle_map<'de, D: Deserializer<'de>>(d: D) -> Result<CandleMap, D::Error> {
    let raw: BTreeMap<String, BTreeMap<String, Records<Candle>>> = nested_map(d)?;
    Ok(raw
        .into_iter()
        .map(|(symbol, by_iv)| (symbol, by_iv.into_iter().map(|(iv, r)| (iv, r.0)).collect()))
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcvDoc {
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default, deserialize_with = "candle_map")]
    pub data: CandleMap,
}

impl OhlcvDoc {
    pub fn series(&self, symbol: &str, interval: Interval) -> &[Candle] {
        self.data
            .get(symbol)
            .and_then(|by_iv| by_iv.get(interval.as_str()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ── Signals ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapDirection {
    Bullish,
    Bearish,
}

/// Gaps without a recognised direction are dropped from their list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FvgSignal {
    #[serde(default)]
    pub index: i64,
    #[serde(rename = "type")]
    pub direction: GapDirection,
    #[serde(default)]
    pub gap: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakDirection {
    #[serde(rename = "BOS_up")]
    Up,
    #[serde(rename = "BOS_down")]
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BosSignal {
    #[serde(default)]
    pub index: i64,
    #[serde(rename = "type")]
    pub direction: BreakDirection,
    #[serde(default)]
    pub level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChochSignal {
    #[serde(default)]
    pub index: i64,
    #[serde(rename = "type", default = "choch_tag")]
    pub kind: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub level: f64,
}

fn choch_tag() -> String {
    "CHoCH".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    #[serde(rename = "FVG", default, deserialize_with = "skip_invalid")]
    pub fvg: Vec<FvgSignal>,
    #[serde(rename = "BOS", default, deserialize_with = "skip_invalid")]
    pub bos: Vec<BosSignal>,
    #[serde(rename = "CHoCH", default, deserialize_with = "skip_invalid")]
    pub choch: Vec<ChochSignal>,
    #[serde(rename = "RSI", default, deserialize_with = "lenient_option")]
    pub rsi: Option<f64>,
}

/// symbol → interval key → bundle.
pub type SignalMap = BTreeMap<String, BTreeMap<String, SignalBundle>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalsDoc {
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default, deserialize_with = "nested_map")]
    pub signals: SignalMap,
}

impl SignalsDoc {
    pub fn bundle(&self, symbol: &str, interval: Interval) -> Option<&SignalBundle> {
        self.signals.get(symbol).and_then(|by_iv| by_iv.get(interval.as_str()))
    }
}

// ── Alarms ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlarmSide {
    Long,
    Short,
}

impl AlarmSide {
    pub fn label(&self) -> &'static str {
        match self {
            AlarmSide::Long => "LONG",
            AlarmSide::Short => "SHORT",
        }
    }
}

impl FromStr for AlarmSide {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" => Ok(AlarmSide::Long),
            "SHORT" => Ok(AlarmSide::Short),
            other => Err(DashError::Decode(format!("unknown alarm side '{other}'"))),
        }
    }
}

/// The two alarm shapes the producer has emitted over time.
///
/// `Structural` carries a higher-timeframe break plus lower-timeframe
/// character changes; `Levels` carries flat price levels. An alarm with a
/// decodable `bos_4h` record is structural, everything else is levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlarmDetail {
    Structural {
        bos_4h: BosSignal,
        choc_30m: Vec<ChochSignal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_price: Option<f64>,
    },
    Levels {
        #[serde(skip_serializing_if = "Option::is_none")]
        bos_idx: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bos_level: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dip_idx: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dip_price: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        alarm_level: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_price: Option<f64>,
    },
}

/// Wire form of an alarm: every detail field of both shapes, all optional.
#[derive(Deserialize)]
struct RawAlarm {
    #[serde(rename = "type")]
    side: AlarmSide,
    symbol: String,
    #[serde(default, deserialize_with = "lenient_option")]
    interval: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    rule: String,
    #[serde(default, deserialize_with = "lenient_option")]
    bos_4h: Option<BosSignal>,
    #[serde(default, deserialize_with = "skip_invalid")]
    choc_30m: Vec<ChochSignal>,
    #[serde(default, deserialize_with = "lenient_option")]
    bos_idx: Option<i64>,
    #[serde(default, deserialize_with = "lenient_option")]
    bos_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_option")]
    dip_idx: Option<i64>,
    #[serde(default, deserialize_with = "lenient_option")]
    dip_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_option")]
    alarm_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient_option")]
    current_price: Option<f64>,
}

impl From<RawAlarm> for Alarm {
    fn from(raw: RawAlarm) -> Self {
        let detail = match raw.bos_4h {
            Some(bos_4h) => AlarmDetail::Structural {
                bos_4h,
                choc_30m: raw.choc_30m,
                current_price: raw.current_price,
            },
            None => AlarmDetail::Levels {
                bos_idx: raw.bos_idx,
                bos_level: raw.bos_level,
                dip_idx: raw.dip_idx,
                dip_price: raw.dip_price,
                alarm_level: raw.alarm_level,
                current_price: raw.current_price,
            },
        };
        Alarm {
            side: raw.side,
            symbol: raw.symbol,
            interval: raw.interval,
            rule: raw.rule,
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAlarm")]
pub struct Alarm {
    #[serde(rename = "type")]
    pub side: AlarmSide,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    pub rule: String,
    #[serde(flatten)]
    pub detail: AlarmDetail,
}

impl Alarm {
    pub fn current_price(&self) -> Option<f64> {
        match &self.detail {
            AlarmDetail::Structural { current_price, .. } | AlarmDetail::Levels { current_price, .. } => {
                *current_price
            }
        }
    }

    pub fn alarm_level(&self) -> Option<f64> {
        match &self.detail {
            AlarmDetail::Levels { alarm_level, .. } => *alarm_level,
            AlarmDetail::Structural { .. } => None,
        }
    }

    /// Structural break level, whichever shape carries it.
    pub fn break_level(&self) -> Option<f64> {
        match &self.detail {
            AlarmDetail::Levels { bos_level, .. } => *bos_level,
            AlarmDetail::Structural { bos_4h, .. } => Some(bos_4h.level),
        }
    }

    /// Local extreme (the dip for long setups), levels shape only.
    pub fn extreme_price(&self) -> Option<f64> {
        match &self.detail {
            AlarmDetail::Levels { dip_price, .. } => *dip_price,
            AlarmDetail::Structural { .. } => None,
        }
    }

    /// Interval the alarm refers to, or `None` when absent or unrecognised.
    pub fn parsed_interval(&self) -> Option<Interval> {
        self.interval.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmsDoc {
    #[serde(default)]
    pub last_update: Option<String>,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub alarms: Vec<Alarm>,
}

// ── SMC-PA dataset ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeAlarm {
    pub symbol: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub range_low: f64,
    #[serde(default)]
    pub range_high: f64,
    #[serde(default)]
    pub range_mid: f64,
    #[serde(default)]
    pub range_position_pct: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmScan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scan_timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interval: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_alarms: u64,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub alarms: Vec<RangeAlarm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signal_type: String,
    #[serde(default)]
    pub choch_level: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub distance_pct: f64,
    #[serde(default)]
    pub max_distance_pct: f64,
    #[serde(default)]
    pub signal_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub break_timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_option")]
    pub interval: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryLongDoc {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scan_timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_coins: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analyzed_coins: u64,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub active_signals: Vec<EntrySignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortCombo {
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signal_type: String,
    #[serde(default, deserialize_with = "lenient_option")]
    pub signal_30m: Option<EntrySignal>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub signal_15m: Option<EntrySignal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signal_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient_option")]
    pub price_above_range: Option<bool>,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub above_range_timeframes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryShortDoc {
    #[serde(default, deserialize_with = "null_as_default")]
    pub scan_timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_coins: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analyzed_coins: u64,
    #[serde(default, deserialize_with = "lenient_option")]
    pub above_range_coins: Option<u64>,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub active_signals: Vec<ShortCombo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortSummaryCoin {
    pub symbol: String,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub timeframes: Vec<String>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub choch_30m: Option<f64>,
    #[serde(default, deserialize_with = "lenient_option")]
    pub choch_15m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub coins: Vec<ShortSummaryCoin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeCoin {
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interval: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub range_position_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryCoin {
    pub symbol: String,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub choch_level: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub coins: Vec<RangeCoin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryGroup {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(default, deserialize_with = "skip_invalid")]
    pub coins: Vec<EntryCoin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub range_ici: RangeGroup,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entry_sinyali: EntryGroup,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryDoc {
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_coins_scanned: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub short_signals: ShortSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub long_signals: LongSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmcPaData {
    pub alarm_2h: Option<AlarmScan>,
    pub alarm_4h: Option<AlarmScan>,
    pub entry_long: Option<EntryLongDoc>,
    pub entry_short: Option<EntryShortDoc>,
    pub summary: Option<SummaryDoc>,
    pub last_update: Option<String>,
}

impl SmcPaData {
    /// Assemble the dataset and stamp it with the newest scan timestamp.
    pub fn assemble(
        alarm_2h: Option<AlarmScan>,
        alarm_4h: Option<AlarmScan>,
        entry_long: Option<EntryLongDoc>,
        entry_short: Option<EntryShortDoc>,
        summary: Option<SummaryDoc>,
    ) -> Self {
        let mut data = Self { alarm_2h, alarm_4h, entry_long, entry_short, summary, last_update: None };
        data.last_update = data.latest_timestamp();
        data
    }

    /// ISO-8601 timestamps sort lexicographically in time order.
    pub fn latest_timestamp(&self) -> Option<String> {
        let stamps = [
            self.alarm_2h.as_ref().map(|d| d.scan_timestamp.as_str()),
            self.alarm_4h.as_ref().map(|d| d.scan_timestamp.as_str()),
            self.entry_long.as_ref().map(|d| d.scan_timestamp.as_str()),
            self.entry_short.as_ref().map(|d| d.scan_timestamp.as_str()),
            self.summary.as_ref().map(|d| d.timestamp.as_str()),
        ];
        stamps
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .max()
            .map(str::to_string)
    }

    pub fn is_empty(&self) -> bool {
        self.alarm_2h.is_none()
            && self.alarm_4h.is_none()
            && self.entry_long.is_none()
            && self.entry_short.is_none()
            && self.summary.is_none()
    }
}

// ── Cached document ──

/// One fetched document, tagged by the resource it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum Document {
    Coins(CoinsDoc),
    Signals(SignalsDoc),
    Alarms(AlarmsDoc),
    Ohlcv(OhlcvDoc),
    SmcPa(SmcPaData),
}

impl Document {
    pub fn last_update(&self) -> Option<&str> {
        match self {
            Document::Coins(d) => d.last_update.as_deref(),
            Document::Signals(d) => d.last_update.as_deref(),
            Document::Alarms(d) => d.last_update.as_deref(),
            Document::Ohlcv(d) => d.last_update.as_deref(),
            Document::SmcPa(d) => d.last_update.as_deref(),
        }
    }

    /// Entry count used in log lines and the state endpoint.
    pub fn len(&self) -> usize {
        match self {
            Document::Coins(d) => d.coins.len(),
            Document::Signals(d) => d.signals.len(),
            Document::Alarms(d) => d.alarms.len(),
            Document::Ohlcv(d) => d.data.len(),
            Document::SmcPa(d) => {
                d.alarm_2h.as_ref().map_or(0, |s| s.alarms.len())
                    + d.alarm_4h.as_ref().map_or(0, |s| s.alarms.len())
                    + d.entry_long.as_ref().map_or(0, |s| s.active_signals.len())
                    + d.entry_short.as_ref().map_or(0, |s| s.active_signals.len())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
