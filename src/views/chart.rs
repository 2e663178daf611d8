use serde::Serialize;

use crate::types::{Interval, OhlcvDoc};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: i64,
    pub close: f64,
}

/// The last `n` closes of a series, oldest first. Empty when the symbol or
/// interval is missing.
pub fn recent_closes(ohlcv: Option<&OhlcvDoc>, symbol: &str, interval: Interval, n: usize) -> Vec<ChartPoint> {
    let Some(doc) = ohlcv else {
        return Vec::new();
    };
    let series = doc.series(symbol, interval);
    let start = series.len().saturating_sub(n);
    series[start..]
        .iter()
        .map(|c| ChartPoint { time: c.open_time, close: c.close })
        .collect()
}

/// Scale closes into a `width` × `height` box, y growing downwards.
/// A flat series is drawn along the bottom edge.
pub fn scale_points(points: &[ChartPoint], width: f64, height: f64) -> Vec<(f64, f64)> {
    if points.is_empty() {
        return Vec::new();
    }
    let min = points.iter().map(|p| p.close).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.close).fold(f64::NEG_INFINITY, f64::max);
    let range = if max - min == 0.0 { 1.0 } else { max - min };
    let last = (points.len() - 1).max(1) as f64;

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let x = i as f64 / last * width;
            let y = height - (p.close - min) / range * height;
            (x, y)
        })
        .collect()
}

/// Integer bar heights (0..=max) for terminal sparklines.
pub fn sparkline_bars(points: &[ChartPoint], max: u64) -> Vec<u64> {
    scale_points(points, 1.0, max as f64)
        .into_iter()
        .map(|(_, y)| (max as f64 - y).round().max(0.0) as u64)
        .collect()
}
