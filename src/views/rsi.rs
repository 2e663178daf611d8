use serde::Serialize;

use super::symbol_matches;
use crate::types::{Interval, SignalsDoc};

/// Timeframes shown on the RSI map.
pub const RSI_TIMEFRAMES: [Interval; 4] = [Interval::H4, Interval::H2, Interval::M30, Interval::M15];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiStatus {
    Overbought,
    Oversold,
    Normal,
}

impl RsiStatus {
    pub fn classify(rsi: f64) -> Self {
        if rsi >= 70.0 {
            RsiStatus::Overbought
        } else if rsi <= 30.0 {
            RsiStatus::Oversold
        } else {
            RsiStatus::Normal
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RsiStatus::Overbought => "Overbought",
            RsiStatus::Oversold => "Oversold",
            RsiStatus::Normal => "Normal",
        }
    }
}

/// Eight colour bands, ten RSI points wide between 20 and 80.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiBand {
    VeryOversold,
    Oversold,
    ApproachingOversold,
    NeutralLow,
    NeutralHigh,
    ApproachingOverbought,
    Overbought,
    VeryOverbought,
}

impl RsiBand {
    pub fn of(rsi: f64) -> Self {
        match rsi {
            r if r >= 80.0 => RsiBand::VeryOverbought,
            r if r >= 70.0 => RsiBand::Overbought,
            r if r >= 60.0 => RsiBand::ApproachingOverbought,
            r if r >= 50.0 => RsiBand::NeutralHigh,
            r if r >= 40.0 => RsiBand::NeutralLow,
            r if r >= 30.0 => RsiBand::ApproachingOversold,
            r if r >= 20.0 => RsiBand::Oversold,
            _ => RsiBand::VeryOversold,
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            RsiBand::VeryOverbought => "#dc2626",
            RsiBand::Overbought => "#ef4444",
            RsiBand::ApproachingOverbought => "#f97316",
            RsiBand::NeutralHigh => "#eab308",
            RsiBand::NeutralLow => "#84cc16",
            RsiBand::ApproachingOversold => "#22c55e",
            RsiBand::Oversold => "#16a34a",
            RsiBand::VeryOversold => "#15803d",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiRow {
    pub symbol: String,
    /// Readings aligned with [`RSI_TIMEFRAMES`].
    pub readings: [Option<f64>; 4],
}

impl RsiRow {
    pub fn reading(&self, tf: Interval) -> Option<f64> {
        RSI_TIMEFRAMES
            .iter()
            .position(|t| *t == tf)
            .and_then(|i| self.readings[i])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RsiPoint {
    pub symbol: String,
    pub rsi: f64,
    /// Percent of chart width.
    pub x: f64,
    /// Percent of chart height; 0 is the top.
    pub y: f64,
    pub band: RsiBand,
    pub status: RsiStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RsiStats {
    pub overbought: usize,
    pub oversold: usize,
    pub total: usize,
    pub average: Option<f64>,
}

pub fn rsi_rows(signals: &SignalsDoc, query: &str) -> Vec<RsiRow> {
    signals
        .signals
        .iter()
        .filter(|(symbol, _)| symbol_matches(symbol, query))
        .map(|(symbol, intervals)| {
            let mut readings = [None; 4];
            for (slot, tf) in readings.iter_mut().zip(RSI_TIMEFRAMES) {
                *slot = intervals.get(tf.as_str()).and_then(|b| b.rsi);
            }
            RsiRow { symbol: symbol.clone(), readings }
        })
        .collect()
}

/// Vertical position: RSI 100 at 5%, RSI 0 at 95%.
pub fn rsi_y(rsi: f64) -> f64 {
    let rsi = rsi.clamp(0.0, 100.0);
    (100.0 - rsi) / 100.0 * 90.0 + 5.0
}

/// Lay out every symbol with a reading on `tf` on a square grid.
pub fn rsi_points(rows: &[RsiRow], tf: Interval) -> Vec<RsiPoint> {
    let valid: Vec<(&RsiRow, f64)> = rows.iter().filter_map(|r| r.reading(tf).map(|v| (r, v))).collect();
    if valid.is_empty() {
        return Vec::new();
    }
    let per_row = (valid.len() as f64).sqrt().ceil() as usize;

    valid
        .into_iter()
        .enumerate()
        .map(|(i, (row, rsi))| {
            let col = i % per_row;
            RsiPoint {
                symbol: row.symbol.clone(),
                rsi,
                x: (col as f64 + 0.5) * (100.0 / per_row as f64),
                y: rsi_y(rsi),
                band: RsiBand::of(rsi),
                status: RsiStatus::classify(rsi),
            }
        })
        .collect()
}

/// Summary counts use strict thresholds (above 70, below 30).
pub fn rsi_stats(rows: &[RsiRow], tf: Interval) -> RsiStats {
    let values: Vec<f64> = rows.iter().filter_map(|r| r.reading(tf)).collect();
    let total = values.len();
    RsiStats {
        overbought: values.iter().filter(|v| **v > 70.0).count(),
        oversold: values.iter().filter(|v| **v < 30.0).count(),
        total,
        average: (total > 0).then(|| values.iter().sum::<f64>() / total as f64),
    }
}
