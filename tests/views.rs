//! Panel projections over hand-built documents.

use margingate_dash::types::*;
use margingate_dash::views::alarms::{alarm_cards, price_action, proximity, side_counts, AlarmFilter, Proximity};
use margingate_dash::views::analysis::{available_symbols, coin_detail};
use margingate_dash::views::chart::{recent_closes, scale_points, sparkline_bars, ChartPoint};
use margingate_dash::views::coins::{coin_cards, Trend, COIN_LIMIT};
use margingate_dash::views::rsi::{rsi_points, rsi_rows, rsi_stats, rsi_y, RsiBand, RsiStatus};
use margingate_dash::views::signals::{interval_detail, signal_cards, signal_totals};
use margingate_dash::views::smc::{overview, short_coins_by_timeframe, short_entries_for, RECENT_ALARM_LIMIT};
use margingate_dash::views::{display_symbol, format_change, format_compact, format_price, symbol_matches};
use serde_json::json;

fn coins(symbols: &[(&str, f64)]) -> CoinsDoc {
    CoinsDoc {
        last_update: Some("2024-05-01T12:00:00".into()),
        coins: symbols
            .iter()
            .map(|(s, change)| Coin {
                symbol: s.to_string(),
                last_price: 100.0,
                price_change_percent: *change,
                volume: 1_000.0,
            })
            .collect(),
    }
}

fn ohlcv(symbol: &str, interval: Interval, closes: &[f64]) -> OhlcvDoc {
    let candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, c)| Candle {
            open_time: i as i64 * interval.millis(),
            open: *c,
            high: *c,
            low: *c,
            close: *c,
            volume: 1.0,
            close_time: (i as i64 + 1) * interval.millis() - 1,
        })
        .collect();
    let mut doc = OhlcvDoc::default();
    doc.data
        .entry(symbol.to_string())
        .or_default()
        .insert(interval.as_str().to_string(), candles);
    doc
}

fn signals_with_rsi(entries: &[(&str, &[(Interval, f64)])]) -> SignalsDoc {
    let mut doc = SignalsDoc::default();
    for (symbol, readings) in entries {
        let by_iv = doc.signals.entry(symbol.to_string()).or_default();
        for (iv, rsi) in readings.iter() {
            by_iv.insert(iv.as_str().to_string(), SignalBundle { rsi: Some(*rsi), ..Default::default() });
        }
    }
    doc
}

fn alarm(value: serde_json::Value) -> Alarm {
    serde_json::from_value(value).unwrap()
}

// ── Test 1: formatting helpers ──
#[test]
fn test_format_helpers() {
    assert_eq!(format_price(64000.456), "64000.46");
    assert_eq!(format_price(0.0000123), "0.000012");
    assert_eq!(format_change(1.5), "+1.50%");
    assert_eq!(format_change(-0.25), "-0.25%");
    assert_eq!(format_change(0.0), "0.00%");
    assert_eq!(format_compact(999.0), "999");
    assert_eq!(format_compact(1_200.0), "1.2K");
    assert_eq!(format_compact(3_000_000.0), "3M");
    assert_eq!(format_compact(5_600_000_000.0), "5.6B");
    assert_eq!(display_symbol("BTCUSDT"), "BTC");
    assert_eq!(display_symbol("USDT"), "USDT");
    assert!(symbol_matches("ETHUSDT", " eth "));
    assert!(symbol_matches("ETHUSDT", ""));
    assert!(!symbol_matches("ETHUSDT", "sol"));
}

// ── Test 2: coin cards ──
#[test]
fn test_coin_cards_limit_and_order() {
    let symbols: Vec<(String, f64)> = (0..30).map(|i| (format!("C{i:02}USDT"), i as f64 - 15.0)).collect();
    let refs: Vec<(&str, f64)> = symbols.iter().map(|(s, c)| (s.as_str(), *c)).collect();
    let doc = coins(&refs);

    let cards = coin_cards(&doc, None, "", COIN_LIMIT);
    assert_eq!(cards.len(), 20);
    assert_eq!(cards[0].symbol, "C00USDT");
    assert_eq!(cards[0].display, "C00");
    assert!(cards.iter().all(|c| c.chart.is_empty()));
}

#[test]
fn test_coin_cards_filter_and_trend() {
    let doc = coins(&[("BTCUSDT", 2.0), ("ETHUSDT", -1.0), ("ETCUSDT", 0.0)]);
    let chart = ohlcv("ETHUSDT", Interval::H4, &(1..=12).map(f64::from).collect::<Vec<_>>());

    let cards = coin_cards(&doc, Some(&chart), "et", COIN_LIMIT);
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].trend, Trend::Down);
    // Zero change counts as down.
    assert_eq!(cards[1].trend, Trend::Down);
    assert_eq!(cards[0].chart.len(), 10);
    assert_eq!(cards[0].chart.last().map(|p| p.close), Some(12.0));

    let btc = coin_cards(&doc, None, "btc", COIN_LIMIT);
    assert_eq!(btc[0].trend, Trend::Up);
}

// ── Test 3: signal cards ──
#[test]
fn test_signal_totals_and_cards() {
    let doc: SignalsDoc = serde_json::from_value(json!({
        "signals": {
            "BTCUSDT": {
                "4h": {"FVG": [{"type": "bullish", "gap": [1.0, 2.0]}], "BOS": [{"type": "BOS_up", "level": 3.0}], "RSI": 72.0},
                "30m": {"CHoCH": [{"level": 1.0}, {"level": 2.0}], "BOS": [{"type": "BOS_down", "level": 1.5}]}
            },
            "ETHUSDT": {"1h": {"RSI": 25.0}}
        }
    }))
    .unwrap();

    let totals = signal_totals(&doc.signals["BTCUSDT"]);
    assert_eq!((totals.fvg, totals.bos, totals.choch), (1, 2, 2));

    let cards = signal_cards(&doc, None, "");
    assert_eq!(cards.len(), 2);
    let btc = &cards[0];
    assert_eq!(btc.interval_count, 2);
    assert!(btc.has_30m && btc.has_4h);
    assert_eq!(btc.rsi_4h_status, Some(RsiStatus::Overbought));

    let eth = &cards[1];
    assert!(!eth.has_4h);
    assert_eq!(eth.rsi_4h, None);
    assert_eq!(eth.rsi_4h_status, None);

    let detail = interval_detail(&doc, None, "BTCUSDT", Interval::M30).unwrap();
    assert_eq!(detail.bundle.choch.len(), 2);
    assert_eq!(detail.rsi_status, None);
    assert!(interval_detail(&doc, None, "BTCUSDT", Interval::M5).is_none());
}

// ── Test 4: RSI map ──
#[test]
fn test_rsi_status_thresholds() {
    assert_eq!(RsiStatus::classify(70.0), RsiStatus::Overbought);
    assert_eq!(RsiStatus::classify(69.99), RsiStatus::Normal);
    assert_eq!(RsiStatus::classify(30.0), RsiStatus::Oversold);
    assert_eq!(RsiStatus::classify(30.01), RsiStatus::Normal);
    assert_eq!(RsiStatus::Overbought.label(), "Overbought");
}

#[test]
fn test_rsi_bands() {
    assert_eq!(RsiBand::of(85.0), RsiBand::VeryOverbought);
    assert_eq!(RsiBand::of(80.0), RsiBand::VeryOverbought);
    assert_eq!(RsiBand::of(79.9), RsiBand::Overbought);
    assert_eq!(RsiBand::of(55.0), RsiBand::NeutralHigh);
    assert_eq!(RsiBand::of(45.0), RsiBand::NeutralLow);
    assert_eq!(RsiBand::of(20.0), RsiBand::Oversold);
    assert_eq!(RsiBand::of(5.0), RsiBand::VeryOversold);
    assert_eq!(RsiBand::of(85.0).hex(), "#dc2626");
}

#[test]
fn test_rsi_grid_layout() {
    assert_eq!(rsi_y(100.0), 5.0);
    assert_eq!(rsi_y(0.0), 95.0);
    assert_eq!(rsi_y(50.0), 50.0);
    assert_eq!(rsi_y(150.0), 5.0);

    let doc = signals_with_rsi(&[
        ("AUSDT", &[(Interval::H4, 75.0), (Interval::M15, 20.0)]),
        ("BUSDT", &[(Interval::H4, 50.0)]),
        ("CUSDT", &[(Interval::H4, 25.0)]),
        ("DUSDT", &[(Interval::H2, 40.0)]),
        ("EUSDT", &[(Interval::H4, 70.0)]),
    ]);
    let rows = rsi_rows(&doc, "");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].reading(Interval::M15), Some(20.0));
    assert_eq!(rows[3].reading(Interval::H4), None);
    assert_eq!(rows[0].reading(Interval::H1), None);

    // Four symbols with a 4h reading → 2 per row.
    let points = rsi_points(&rows, Interval::H4);
    assert_eq!(points.len(), 4);
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![25.0, 75.0, 25.0, 75.0]);
    assert_eq!(points[0].symbol, "AUSDT");
    assert_eq!(points[0].status, RsiStatus::Overbought);
    assert!(rsi_points(&rows, Interval::M30).is_empty());

    // Exactly 70 is overbought on a point, but not counted as above 70.
    let stats = rsi_stats(&rows, Interval::H4);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.overbought, 1);
    assert_eq!(stats.oversold, 1);
    assert_eq!(stats.average, Some(55.0));
    assert_eq!(rsi_stats(&rows, Interval::M30).average, None);
}

// ── Test 5: alarms ──
#[test]
fn test_long_pullback_narrative() {
    let a = alarm(json!({
        "type": "LONG", "symbol": "BTCUSDT", "interval": "2h",
        "bos_level": 65000.0, "dip_price": 62000.0, "alarm_level": 63500.0, "current_price": 63700.0,
        "rule": "2h BOS_up equilibrium pullback"
    }));
    let pa = price_action(&a);
    assert_eq!(pa.title, "Uptrend Pullback");
    assert!(pa.description.contains("65000") && pa.description.contains("2h"));
    assert!(pa.strategy.contains("63500"));
    assert!(pa.risk.contains("62000"));
    assert_eq!(proximity(&a), Some(Proximity::Near));
}

#[test]
fn test_short_weakness_narrative() {
    let a = alarm(json!({
        "type": "SHORT", "symbol": "ETHUSDT",
        "bos_4h": {"type": "BOS_up", "level": 3200.0},
        "choc_30m": [{"from": "BOS_up", "to": "BOS_down", "level": 3150.0}],
        "rule": "4h BOS_up + 30m last 20 CHoCH"
    }));
    let pa = price_action(&a);
    assert_eq!(pa.title, "Trend Weakness and Bearish Signal");
    assert!(pa.description.contains("Transition from bullish to bearish"));
    assert!(pa.strategy.contains("3150"));
    assert!(pa.risk.contains("3200"));
    assert_eq!(proximity(&a), None);
}

#[test]
fn test_generic_narrative_and_proximity_bands() {
    let a = alarm(json!({
        "type": "LONG", "symbol": "SOLUSDT", "alarm_level": 100.0, "current_price": 102.0, "rule": "custom rule"
    }));
    let pa = price_action(&a);
    assert_eq!(pa.title, "Technical Analysis Signal");
    assert_eq!(pa.description, "custom rule");
    assert!(pa.strategy.contains("LONG"));
    assert_eq!(proximity(&a), Some(Proximity::Approaching));

    let far = alarm(json!({"type": "LONG", "symbol": "S", "alarm_level": 100.0, "current_price": 110.0}));
    assert_eq!(proximity(&far), Some(Proximity::Distant));
    let no_price = alarm(json!({"type": "LONG", "symbol": "S", "alarm_level": 100.0}));
    assert_eq!(proximity(&no_price), None);
}

#[test]
fn test_alarm_filter_and_counts() {
    let doc = AlarmsDoc {
        last_update: None,
        alarms: vec![
            alarm(json!({"type": "LONG", "symbol": "BTCUSDT", "interval": "bogus"})),
            alarm(json!({"type": "SHORT", "symbol": "BTCUSDT", "bos_4h": {"type": "BOS_up", "level": 1.0}})),
            alarm(json!({"type": "LONG", "symbol": "ETHUSDT", "interval": "30m"})),
        ],
    };
    let counts = side_counts(&doc);
    assert_eq!((counts.long, counts.short), (2, 1));

    let all = alarm_cards(&doc, None, &AlarmFilter::default());
    assert_eq!(all.len(), 3);
    // Unknown interval falls back to 4h.
    assert_eq!(all[0].interval, Interval::H4);
    assert_eq!(all[2].interval, Interval::M30);

    let long_btc = AlarmFilter { side: Some(AlarmSide::Long), query: "btc".into() };
    let cards = alarm_cards(&doc, None, &long_btc);
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].side, AlarmSide::Long);
}

// ── Test 6: analysis ──
#[test]
fn test_available_symbols_union_sorted() {
    let c = coins(&[("SOLUSDT", 1.0), ("BTCUSDT", 1.0)]);
    let s = signals_with_rsi(&[("ETHUSDT", &[(Interval::H4, 50.0)]), ("BTCUSDT", &[])]);
    let a = AlarmsDoc { last_update: None, alarms: vec![alarm(json!({"type": "LONG", "symbol": "ADAUSDT"}))] };

    let all = available_symbols(Some(&c), Some(&s), Some(&a), "");
    assert_eq!(all, vec!["ADAUSDT", "BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    assert_eq!(available_symbols(Some(&c), None, None, "so"), vec!["SOLUSDT"]);
    assert!(available_symbols(None, None, None, "").is_empty());
}

#[test]
fn test_coin_detail_collects_everything() {
    let c = coins(&[("BTCUSDT", 1.0)]);
    let s = signals_with_rsi(&[("BTCUSDT", &[(Interval::H4, 50.0), (Interval::M30, 40.0)])]);
    let a = AlarmsDoc {
        last_update: None,
        alarms: vec![
            alarm(json!({"type": "LONG", "symbol": "BTCUSDT"})),
            alarm(json!({"type": "LONG", "symbol": "ETHUSDT"})),
        ],
    };
    let o = ohlcv("BTCUSDT", Interval::H4, &[1.0; 30]);

    let detail = coin_detail("BTCUSDT", Some(&c), Some(&s), Some(&a), Some(&o));
    assert!(detail.coin.is_some());
    assert_eq!(detail.signals.len(), 2);
    assert_eq!(detail.alarms.len(), 1);
    assert_eq!(detail.chart.len(), 20);

    let missing = coin_detail("XRPUSDT", Some(&c), Some(&s), Some(&a), None);
    assert!(missing.coin.is_none() && missing.signals.is_empty() && missing.alarms.is_empty());
}

// ── Test 7: SMC-PA ──
fn smc_fixture() -> SmcPaData {
    let scan = |interval: &str, n: usize| AlarmScan {
        scan_timestamp: "2024-05-01T10:00:00".into(),
        interval: interval.into(),
        total_alarms: n as u64,
        alarms: (0..n)
            .map(|i| serde_json::from_value(json!({"symbol": format!("{interval}-{i}")})).unwrap())
            .collect(),
    };
    let summary: SummaryDoc = serde_json::from_value(json!({
        "timestamp": "2024-05-01T11:00:00",
        "short_signals": {"count": 3, "coins": [
            {"symbol": "AUSDT", "timeframes": ["4h", "2h"], "choch_30m": 1.0},
            {"symbol": "BUSDT", "timeframes": ["2h"], "choch_15m": 2.0},
            {"symbol": "CUSDT", "timeframes": []}
        ]}
    }))
    .unwrap();
    let entry_short: EntryShortDoc = serde_json::from_value(json!({
        "scan_timestamp": "2024-05-01T09:00:00",
        "active_signals": [
            {"symbol": "AUSDT", "signal_30m": {"symbol": "AUSDT"}, "above_range_timeframes": ["4h"]},
            {"symbol": "BUSDT", "signal_15m": {"symbol": "BUSDT"}, "above_range_timeframes": ["2h", "4h"]}
        ]
    }))
    .unwrap();
    SmcPaData::assemble(Some(scan("2h", 3)), Some(scan("4h", 6)), None, Some(entry_short), Some(summary))
}

#[test]
fn test_smc_overview() {
    let data = smc_fixture();
    let ov = overview(&data);
    assert_eq!(ov.total_alarms, 9);
    assert_eq!(ov.recent_alarms.len(), RECENT_ALARM_LIMIT);
    // 4h scan first, then 2h.
    assert_eq!(ov.recent_alarms[0].interval, Interval::H4);
    assert_eq!(ov.recent_alarms[6].interval, Interval::H2);
    assert_eq!(ov.long_entry_count, 0);
    assert_eq!(ov.short_combo_count, 2);
    // A on 4h, 2h, 30m; B on 2h, 15m.
    assert_eq!(ov.short_signal_total, 5);
    assert_eq!(ov.last_update.as_deref(), Some("2024-05-01T11:00:00"));
}

#[test]
fn test_smc_short_grouping() {
    let data = smc_fixture();
    let grouped = short_coins_by_timeframe(&data);
    let names = |tf: Interval| -> Vec<String> {
        grouped.get(&tf).map(|v| v.iter().map(|c| c.symbol.clone()).collect()).unwrap_or_default()
    };
    assert_eq!(names(Interval::H4), vec!["AUSDT"]);
    assert_eq!(names(Interval::H2), vec!["AUSDT", "BUSDT"]);
    assert_eq!(names(Interval::M30), vec!["AUSDT"]);
    assert_eq!(names(Interval::M15), vec!["BUSDT"]);

    let symbols = |tf| short_entries_for(&data, tf).iter().map(|s| s.symbol.clone()).collect::<Vec<_>>();
    assert_eq!(symbols(Interval::H4), vec!["AUSDT", "BUSDT"]);
    assert_eq!(symbols(Interval::H2), vec!["BUSDT"]);
    assert_eq!(symbols(Interval::M30), vec!["AUSDT"]);
    assert_eq!(symbols(Interval::M15), vec!["BUSDT"]);
    assert_eq!(symbols(Interval::D1).len(), 2);

    let empty = SmcPaData::default();
    assert!(short_coins_by_timeframe(&empty).is_empty());
    assert!(short_entries_for(&empty, Interval::H4).is_empty());
}

// ── Test 8: chart scaling ──
#[test]
fn test_chart_scaling() {
    let pts: Vec<ChartPoint> = [10.0, 20.0, 15.0].iter().enumerate().map(|(i, c)| ChartPoint { time: i as i64, close: *c }).collect();
    let scaled = scale_points(&pts, 100.0, 50.0);
    assert_eq!(scaled, vec![(0.0, 50.0), (50.0, 0.0), (100.0, 25.0)]);
    assert_eq!(sparkline_bars(&pts, 8), vec![0, 8, 4]);

    // Flat series sits on the bottom edge instead of dividing by zero.
    let flat = vec![ChartPoint { time: 0, close: 5.0 }, ChartPoint { time: 1, close: 5.0 }];
    assert_eq!(scale_points(&flat, 10.0, 10.0), vec![(0.0, 10.0), (10.0, 10.0)]);
    assert!(scale_points(&[], 10.0, 10.0).is_empty());

    let doc = ohlcv("BTCUSDT", Interval::H4, &[1.0, 2.0, 3.0]);
    assert_eq!(recent_closes(Some(&doc), "BTCUSDT", Interval::H4, 2).iter().map(|p| p.close).collect::<Vec<_>>(), vec![2.0, 3.0]);
    assert!(recent_closes(None, "BTCUSDT", Interval::H4, 2).is_empty());
}
