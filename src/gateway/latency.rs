//! Rolling request latency per request type.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

pub const DEFAULT_WINDOW: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
}

#[derive(Debug, Clone)]
pub struct LatencyTracker {
    windows: BTreeMap<String, VecDeque<Duration>>,
    capacity: usize,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl LatencyTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, request_type: &str, elapsed: Duration) {
        let window = self.windows.entry(request_type.to_string()).or_default();
        window.push_back(elapsed);
        while window.len() > self.capacity {
            window.pop_front();
        }
    }

    pub fn stats(&self, request_type: &str) -> Option<LatencyStats> {
        self.windows.get(request_type).and_then(|w| summarize(w))
    }

    /// Stats for every request type that has at least one sample.
    pub fn summary(&self) -> BTreeMap<String, LatencyStats> {
        self.windows
            .iter()
            .filter_map(|(kind, w)| summarize(w).map(|s| (kind.clone(), s)))
            .collect()
    }
}

fn summarize(window: &VecDeque<Duration>) -> Option<LatencyStats> {
    if window.is_empty() {
        return None;
    }
    let mut ms: Vec<f64> = window.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
    ms.sort_by(|a, b| a.total_cmp(b));
    let n = ms.len();
    let mean_ms = ms.iter().sum::<f64>() / n as f64;
    // nearest rank on round(p * (n - 1)), ties to even
    let percentile = |p: f64| {
        let idx = (p * (n - 1) as f64).round_ties_even() as usize;
        ms[idx.min(n - 1)]
    };
    Some(LatencyStats {
        count: n,
        mean_ms,
        p50_ms: percentile(0.5),
        p90_ms: percentile(0.9),
    })
}
