use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

const WINDOW_SIZE: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub count: usize,
}

/// Rolling window of fetch durations and outcomes for one resource.
#[derive(Debug, Default)]
pub struct FetchLatency {
    durations: VecDeque<u64>,
    successes: u64,
    failures: u64,
}

impl FetchLatency {
    pub fn new() -> Self {
        Self {
            durations: VecDeque::with_capacity(WINDOW_SIZE),
            successes: 0,
            failures: 0,
        }
    }

    pub fn record(&mut self, elapsed: Duration, ok: bool) {
        push_capped(&mut self.durations, elapsed.as_millis() as u64);
        if ok {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    pub fn stats(&self) -> LatencyStats {
        compute_stats(&self.durations)
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

fn push_capped(q: &mut VecDeque<u64>, val: u64) {
    if q.len() >= WINDOW_SIZE {
        q.pop_front();
    }
    q.push_back(val);
}

fn compute_stats(q: &VecDeque<u64>) -> LatencyStats {
    if q.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted: Vec<u64> = q.iter().copied().collect();
    sorted.sort_unstable();
    let n = sorted.len();
    LatencyStats {
        p50_ms: sorted[n * 50 / 100],
        p95_ms: sorted[(n * 95 / 100).min(n - 1)],
        p99_ms: sorted[(n * 99 / 100).min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
        count: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_drops_oldest_and_counts_outcomes() {
        let mut lat = FetchLatency::new();
        assert_eq!(lat.stats(), LatencyStats::default());

        for ms in 0..(WINDOW_SIZE as u64 + 10) {
            lat.record(Duration::from_millis(ms), ms % 2 == 0);
        }
        let stats = lat.stats();
        assert_eq!(stats.count, WINDOW_SIZE);
        assert_eq!(stats.min_ms, 10);
        assert_eq!(stats.max_ms, WINDOW_SIZE as u64 + 9);
        assert!(stats.p50_ms <= stats.p95_ms && stats.p95_ms <= stats.p99_ms);
        assert_eq!(lat.successes() + lat.failures(), WINDOW_SIZE as u64 + 10);
    }
}
