//! Basic Metrics
//!
//! Request counters and latency tracking for the server.

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    total_ops: AtomicU64,
    errors: AtomicU64,
    ops_by_command: RwLock<HashMap<&'static str, u64>>,

    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_ops: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            ops_by_command: RwLock::new(HashMap::new()),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    /// Record a completed request
    pub fn record_operation(&self, command: &'static str, latency: Duration) {
        self.total_ops.fetch_add(1, Ordering::Relaxed);
        *self.ops_by_command.write().entry(command).or_insert(0) += 1;

        let latency_us = latency.as_micros() as u64;
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        self.latency_min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// Record a request answered with an error
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_ops(&self) -> u64 {
        self.total_ops.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Per-command counts, sorted by command name
    pub fn ops_by_command(&self) -> Vec<(&'static str, u64)> {
        let mut ops: Vec<_> = self.ops_by_command.read().iter().map(|(k, v)| (*k, *v)).collect();
        ops.sort_unstable();
        ops
    }

    pub fn avg_latency_us(&self) -> f64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        sum as f64 / count as f64
    }

    pub fn min_latency_us(&self) -> u64 {
        let min = self.latency_min_us.load(Ordering::Relaxed);
        if min == u64::MAX {
            0
        } else {
            min
        }
    }

    pub fn max_latency_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.record_operation("GET", Duration::from_micros(100));
        metrics.record_operation("GET", Duration::from_micros(200));
        metrics.record_operation("CLUSTER", Duration::from_micros(150));
        metrics.record_error();

        assert_eq!(metrics.total_ops(), 3);
        assert_eq!(metrics.errors(), 1);
        assert_eq!(metrics.min_latency_us(), 100);
        assert_eq!(metrics.max_latency_us(), 200);
        assert!((metrics.avg_latency_us() - 150.0).abs() < 0.1);
        assert_eq!(metrics.ops_by_command(), vec![("CLUSTER", 1), ("GET", 2)]);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = Metrics::default();
        assert_eq!(metrics.min_latency_us(), 0);
        assert_eq!(metrics.avg_latency_us(), 0.0);
    }
}
