use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::DashError;
use crate::fetch::Fetcher;
use crate::resource::ResourceKind;
use crate::types::*;

pub const SYMBOLS: &[(&str, f64)] = &[
    ("BTCUSDT", 67_000.0),
    ("ETHUSDT", 3_200.0),
    ("BNBUSDT", 580.0),
    ("SOLUSDT", 150.0),
    ("AVAXUSDT", 35.0),
    ("LINKUSDT", 14.5),
    ("XRPUSDT", 0.52),
    ("ADAUSDT", 0.45),
    ("DOGEUSDT", 0.12),
];

pub const CANDLES_PER_SERIES: usize = 50;

const CANDLE_INTERVALS: [Interval; 5] = [Interval::M15, Interval::M30, Interval::H1, Interval::H2, Interval::H4];
const SIGNAL_INTERVALS: [Interval; 4] = [Interval::M15, Interval::M30, Interval::H2, Interval::H4];

/// Random-walk market that produces every published document shape.
pub struct MarketGenerator {
    rng: StdRng,
    prices: HashMap<String, f64>,
}

impl MarketGenerator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic output for benches and tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let prices = SYMBOLS.iter().map(|(s, p)| (s.to_string(), *p)).collect();
        Self { rng, prices }
    }

    pub fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn stamp() -> String {
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    /// Move every price by up to ±0.5%.
    pub fn tick(&mut self) {
        for price in self.prices.values_mut() {
            *price += *price * self.rng.gen_range(-0.005..0.005);
        }
    }

    fn current(&self, symbol: &str) -> f64 {
        self.price(symbol).unwrap_or(1.0)
    }

    pub fn coins(&mut self) -> CoinsDoc {
        self.tick();
        let coins = SYMBOLS
            .iter()
            .map(|(sym, _)| {
                let last_price = self.current(sym);
                Coin {
                    symbol: sym.to_string(),
                    last_price,
                    price_change_percent: self.rng.gen_range(-8.0..8.0),
                    volume: self.rng.gen_range(1e5..5e9),
                }
            })
            .collect();
        CoinsDoc { last_update: Some(Self::stamp()), coins }
    }

    /// Candles walking towards each symbol's current price.
    pub fn ohlcv(&mut self, now_ms: i64) -> OhlcvDoc {
        let mut data = CandleMap::new();
        for (sym, _) in SYMBOLS {
            let end_price = self.current(sym);
            let mut by_iv = BTreeMap::new();
            for iv in CANDLE_INTERVALS {
                by_iv.insert(iv.as_str().to_string(), self.series(end_price, iv, now_ms));
            }
            data.insert(sym.to_string(), by_iv);
        }
        OhlcvDoc { last_update: Some(Self::stamp()), data }
    }

    fn series(&mut self, end_price: f64, iv: Interval, now_ms: i64) -> Vec<Candle> {
        let step = iv.millis();
        let first_open = now_ms - step * CANDLES_PER_SERIES as i64;
        let mut open = end_price * self.rng.gen_range(0.9..1.1);
        let drift = (end_price - open) / CANDLES_PER_SERIES as f64;

        (0..CANDLES_PER_SERIES)
            .map(|i| {
                let close = if i + 1 == CANDLES_PER_SERIES {
                    end_price
                } else {
                    open + drift + open * self.rng.gen_range(-0.01..0.01)
                };
                let high = open.max(close) * (1.0 + self.rng.gen_range(0.0..0.005));
                let low = open.min(close) * (1.0 - self.rng.gen_range(0.0..0.005));
                let open_time = first_open + step * i as i64;
                let candle = Candle {
                    open_time,
                    open,
                    high,
                    low,
                    close,
                    volume: self.rng.gen_range(100.0..10_000.0),
                    close_time: open_time + step - 1,
                };
                open = close;
                candle
            })
            .collect()
    }

    pub fn signals(&mut self) -> SignalsDoc {
        let mut signals = SignalMap::new();
        for (sym, _) in SYMBOLS {
            let price = self.current(sym);
            let mut by_iv = BTreeMap::new();
            for iv in SIGNAL_INTERVALS {
                by_iv.insert(iv.as_str().to_string(), self.bundle(price));
            }
            signals.insert(sym.to_string(), by_iv);
        }
        SignalsDoc { last_update: Some(Self::stamp()), signals }
    }

    fn bundle(&mut self, price: f64) -> SignalBundle {
        let fvg = (0..self.rng.gen_range(0..3))
            .map(|i| {
                let lo = price * self.rng.gen_range(0.95..1.0);
                FvgSignal {
                    index: 40 + i,
                    direction: if self.rng.gen_bool(0.5) { GapDirection::Bullish } else { GapDirection::Bearish },
                    gap: (lo, lo * 1.01),
                }
            })
            .collect();
        let bos = (0..self.rng.gen_range(0..3))
            .map(|i| BosSignal {
                index: 30 + i,
                direction: if self.rng.gen_bool(0.6) { BreakDirection::Up } else { BreakDirection::Down },
                level: price * self.rng.gen_range(0.97..1.03),
            })
            .collect();
        let choch = (0..self.rng.gen_range(0..2))
            .map(|i| ChochSignal {
                index: 45 + i,
                kind: "CHoCH".to_string(),
                from: "BOS_up".to_string(),
                to: "BOS_down".to_string(),
                level: price * self.rng.gen_range(0.98..1.02),
            })
            .collect();
        SignalBundle {
            fvg,
            bos,
            choch,
            rsi: self.rng.gen_bool(0.9).then(|| self.rng.gen_range(12.0..88.0)),
        }
    }

    pub fn alarms(&mut self) -> AlarmsDoc {
        let mut alarms = Vec::new();
        for (sym, _) in SYMBOLS {
            let price = self.current(sym);
            if self.rng.gen_bool(0.4) {
                let bos_level = price * self.rng.gen_range(0.97..0.995);
                let dip_price = bos_level * self.rng.gen_range(0.95..0.99);
                alarms.push(Alarm {
                    side: AlarmSide::Long,
                    symbol: sym.to_string(),
                    interval: Some(Interval::H4.as_str().to_string()),
                    rule: "4h BOS_up equilibrium pullback".to_string(),
                    detail: AlarmDetail::Levels {
                        bos_idx: Some(32),
                        bos_level: Some(bos_level),
                        dip_idx: Some(41),
                        dip_price: Some(dip_price),
                        alarm_level: Some((bos_level + dip_price) / 2.0),
                        current_price: Some(price),
                    },
                });
            }
            if self.rng.gen_bool(0.25) {
                let level = price * self.rng.gen_range(0.9..0.98);
                alarms.push(Alarm {
                    side: AlarmSide::Short,
                    symbol: sym.to_string(),
                    interval: Some(Interval::M30.as_str().to_string()),
                    rule: "4h BOS_up + 30m last 20 CHoCH".to_string(),
                    detail: AlarmDetail::Structural {
                        bos_4h: BosSignal { index: 38, direction: BreakDirection::Up, level },
                        choc_30m: vec![ChochSignal {
                            index: 47,
                            kind: "CHoCH".to_string(),
                            from: "BOS_up".to_string(),
                            to: "BOS_down".to_string(),
                            level: price * 0.99,
                        }],
                        current_price: Some(price),
                    },
                });
            }
        }
        AlarmsDoc { last_update: Some(Self::stamp()), alarms }
    }

    pub fn smc(&mut self) -> SmcPaData {
        let stamp = Self::stamp();
        let alarm_2h = self.scan(Interval::H2, &stamp);
        let alarm_4h = self.scan(Interval::H4, &stamp);

        let mut long_signals = Vec::new();
        let mut short_signals = Vec::new();
        let mut short_coins = Vec::new();
        for (sym, _) in SYMBOLS {
            let price = self.current(sym);
            if self.rng.gen_bool(0.3) {
                long_signals.push(self.entry(sym, price, "CHoCH_up", &stamp, Interval::M30));
            }
            if self.rng.gen_bool(0.3) {
                let with_30m = self.rng.gen_bool(0.6);
                let with_15m = self.rng.gen_bool(0.5);
                let timeframes: Vec<String> = [Interval::H4, Interval::H2]
                    .into_iter()
                    .filter(|_| self.rng.gen_bool(0.6))
                    .map(|iv| iv.as_str().to_string())
                    .collect();
                let signal_30m = with_30m.then(|| self.entry(sym, price, "CHoCH_down", &stamp, Interval::M30));
                let signal_15m = with_15m.then(|| self.entry(sym, price, "CHoCH_down", &stamp, Interval::M15));
                short_coins.push(ShortSummaryCoin {
                    symbol: sym.to_string(),
                    timeframes: timeframes.clone(),
                    choch_30m: signal_30m.as_ref().map(|s| s.choch_level),
                    choch_15m: signal_15m.as_ref().map(|s| s.choch_level),
                });
                short_signals.push(ShortCombo {
                    symbol: sym.to_string(),
                    timestamp: stamp.clone(),
                    signal_type: "SHORT_COMBO".to_string(),
                    signal_30m,
                    signal_15m,
                    signal_active: true,
                    reason: "price above range with lower timeframe CHoCH".to_string(),
                    price_above_range: Some(!timeframes.is_empty()),
                    above_range_timeframes: timeframes,
                });
            }
        }

        let range_coins: Vec<RangeCoin> = alarm_4h
            .alarms
            .iter()
            .map(|a| RangeCoin {
                symbol: a.symbol.clone(),
                interval: alarm_4h.interval.clone(),
                current_price: a.current_price,
                range_position_pct: a.range_position_pct,
            })
            .collect();
        let entry_coins: Vec<EntryCoin> = long_signals
            .iter()
            .map(|s| EntryCoin { symbol: s.symbol.clone(), current_price: s.current_price, choch_level: s.choch_level })
            .collect();

        let summary = SummaryDoc {
            timestamp: stamp.clone(),
            total_coins_scanned: SYMBOLS.len() as u64,
            short_signals: ShortSummary { count: short_coins.len() as u64, coins: short_coins },
            long_signals: LongSummary {
                range_ici: RangeGroup { count: range_coins.len() as u64, coins: range_coins },
                entry_sinyali: EntryGroup { count: entry_coins.len() as u64, coins: entry_coins },
            },
        };
        let entry_long = EntryLongDoc {
            scan_timestamp: stamp.clone(),
            total_coins: SYMBOLS.len() as u64,
            analyzed_coins: SYMBOLS.len() as u64,
            active_signals: long_signals,
        };
        let entry_short = EntryShortDoc {
            scan_timestamp: stamp,
            total_coins: SYMBOLS.len() as u64,
            analyzed_coins: SYMBOLS.len() as u64,
            above_range_coins: Some(short_signals.iter().filter(|s| s.price_above_range == Some(true)).count() as u64),
            active_signals: short_signals,
        };

        SmcPaData::assemble(Some(alarm_2h), Some(alarm_4h), Some(entry_long), Some(entry_short), Some(summary))
    }

    fn scan(&mut self, iv: Interval, stamp: &str) -> AlarmScan {
        let mut alarms = Vec::new();
        for (sym, _) in SYMBOLS {
            if !self.rng.gen_bool(0.35) {
                continue;
            }
            let price = self.current(sym);
            let range_low = price * self.rng.gen_range(0.9..0.98);
            let range_high = price * self.rng.gen_range(1.02..1.1);
            alarms.push(RangeAlarm {
                symbol: sym.to_string(),
                current_price: price,
                range_low,
                range_high,
                range_mid: (range_low + range_high) / 2.0,
                range_position_pct: (price - range_low) / (range_high - range_low) * 100.0,
                timestamp: stamp.to_string(),
            });
        }
        AlarmScan {
            scan_timestamp: stamp.to_string(),
            interval: iv.as_str().to_string(),
            total_alarms: alarms.len() as u64,
            alarms,
        }
    }

    fn entry(&mut self, sym: &str, price: f64, signal_type: &str, stamp: &str, iv: Interval) -> EntrySignal {
        let choch_level = price * self.rng.gen_range(0.98..1.02);
        EntrySignal {
            symbol: sym.to_string(),
            timestamp: stamp.to_string(),
            signal_type: signal_type.to_string(),
            choch_level,
            current_price: price,
            distance_pct: (price - choch_level).abs() / choch_level * 100.0,
            max_distance_pct: 2.0,
            signal_active: true,
            break_timestamp: stamp.to_string(),
            interval: Some(iv.as_str().to_string()),
        }
    }

    pub fn document(&mut self, kind: ResourceKind) -> Document {
        match kind {
            ResourceKind::Coins => Document::Coins(self.coins()),
            ResourceKind::Signals => Document::Signals(self.signals()),
            ResourceKind::Alarms => Document::Alarms(self.alarms()),
            ResourceKind::Ohlcv => Document::Ohlcv(self.ohlcv(Self::now_ms())),
            ResourceKind::SmcPa => Document::SmcPa(self.smc()),
        }
    }
}

impl Default for MarketGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Offline document source backed by [`MarketGenerator`].
pub struct SyntheticFetcher {
    market: Mutex<MarketGenerator>,
    latency: Duration,
    failing: HashSet<ResourceKind>,
}

impl SyntheticFetcher {
    pub fn new(market: MarketGenerator) -> Self {
        Self { market: Mutex::new(market), latency: Duration::ZERO, failing: HashSet::new() }
    }

    /// Simulated network delay before each document is produced.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every fetch of `kind` fail.
    pub fn failing(mut self, kind: ResourceKind) -> Self {
        self.failing.insert(kind);
        self
    }
}

impl Fetcher for SyntheticFetcher {
    fn fetch(&self, kind: ResourceKind) -> BoxFuture<'_, Result<Document, DashError>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.failing.contains(&kind) {
                return Err(DashError::Fetch(format!("{kind} unavailable")));
            }
            let mut market = self.market.lock().unwrap_or_else(|e| e.into_inner());
            Ok(market.document(kind))
        })
    }
}
