//! Run-scoped statistics for the probe stage
//!
//! One `RunStats` instance lives for exactly one probing run (benchmark
//! sub-runs included) and is shared between the probe workers, which record
//! outcomes, and presentation collaborators, which poll `snapshot`.

use crate::sub::models::ProbeResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Min/max latency over successful probes
///
/// `None` until the first successful sample, so a genuine zero-duration
/// sample is representable and always sets the minimum.
#[derive(Debug, Default, Clone, Copy)]
struct LatencyBounds {
    min: Option<Duration>,
    max: Option<Duration>,
}

impl LatencyBounds {
    fn record(&mut self, latency: Duration) {
        match self.min {
            Some(current) if latency >= current => {}
            _ => self.min = Some(latency),
        }
        match self.max {
            Some(current) if latency <= current => {}
            _ => self.max = Some(latency),
        }
    }
}

/// Live counters for one probing run
#[derive(Debug)]
pub struct RunStats {
    total: u64,
    processed: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    latency: Mutex<LatencyBounds>,
    started: Instant,
}

impl RunStats {
    /// Create the aggregator for a run of `total` jobs
    pub fn new(total: u64) -> Self {
        Self {
            total,
            processed: AtomicU64::new(0),
            success: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            latency: Mutex::new(LatencyBounds::default()),
            started: Instant::now(),
        }
    }

    /// Record one probe outcome
    pub fn record(&self, result: &ProbeResult) {
        if result.success {
            self.record_success(result.latency);
        } else {
            self.record_failure();
        }
    }

    pub fn record_success(&self, latency: Duration) {
        self.success.fetch_add(1, Ordering::Relaxed);
        {
            // The two bounds are updated under one short-lived lock; counters
            // stay lock-free.
            let mut bounds = self.latency.lock().expect("latency mutex poisoned");
            bounds.record(latency);
        }
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time view of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let bounds = *self.latency.lock().expect("latency mutex poisoned");
        StatsSnapshot {
            total: self.total,
            processed: self.processed.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            min_latency: bounds.min,
            max_latency: bounds.max,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Frozen view of `RunStats`, safe to hand to any renderer
#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub total: u64,
    pub processed: u64,
    pub success: u64,
    pub failed: u64,
    pub min_latency: Option<Duration>,
    pub max_latency: Option<Duration>,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Share of successful probes over the whole run, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f64 * 100.0 / self.total as f64
        }
    }

    /// Rolling throughput in results per second
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.processed as f64 / secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counts_converge() {
        let stats = RunStats::new(5);
        stats.record_success(Duration::from_millis(10));
        stats.record_success(Duration::from_millis(20));
        stats.record_failure();
        stats.record_failure();
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.total, 5);
        assert_eq!(snap.success, 2);
        assert_eq!(snap.failed, 3);
        assert_eq!(snap.processed, 5);
        assert_eq!(snap.success + snap.failed, snap.total);
    }

    #[test]
    fn test_first_sample_sets_both_bounds() {
        let stats = RunStats::new(1);
        stats.record_success(Duration::from_millis(42));

        let snap = stats.snapshot();
        assert_eq!(snap.min_latency, Some(Duration::from_millis(42)));
        assert_eq!(snap.max_latency, Some(Duration::from_millis(42)));
    }

    #[test]
    fn test_bounds_track_min_and_max() {
        let stats = RunStats::new(3);
        stats.record_success(Duration::from_millis(30));
        stats.record_success(Duration::from_millis(5));
        stats.record_success(Duration::from_millis(90));

        let snap = stats.snapshot();
        assert_eq!(snap.min_latency, Some(Duration::from_millis(5)));
        assert_eq!(snap.max_latency, Some(Duration::from_millis(90)));
    }

    #[test]
    fn test_zero_duration_sample_is_representable() {
        let stats = RunStats::new(2);
        stats.record_success(Duration::from_millis(7));
        stats.record_success(Duration::ZERO);

        let snap = stats.snapshot();
        assert_eq!(snap.min_latency, Some(Duration::ZERO));
        assert_eq!(snap.max_latency, Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_bounds_unset_without_successes() {
        let stats = RunStats::new(2);
        stats.record_failure();
        stats.record_failure();

        let snap = stats.snapshot();
        assert_eq!(snap.min_latency, None);
        assert_eq!(snap.max_latency, None);
        assert_eq!(snap.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate() {
        let stats = RunStats::new(4);
        stats.record_success(Duration::from_millis(1));
        stats.record_success(Duration::from_millis(1));
        stats.record_success(Duration::from_millis(1));
        stats.record_failure();
        assert_eq!(stats.snapshot().success_rate(), 75.0);
    }

    #[test]
    fn test_concurrent_updates_converge() {
        let stats = Arc::new(RunStats::new(400));
        let mut handles = Vec::new();
        for worker in 0..4 {
            let stats = Arc::clone(&stats);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    if i % 2 == 0 {
                        stats.record_success(Duration::from_millis(worker * 10 + 1));
                    } else {
                        stats.record_failure();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().expect("stats worker panicked");
        }

        let snap = stats.snapshot();
        assert_eq!(snap.processed, 400);
        assert_eq!(snap.success, 200);
        assert_eq!(snap.failed, 200);
        assert_eq!(snap.min_latency, Some(Duration::from_millis(1)));
        assert_eq!(snap.max_latency, Some(Duration::from_millis(31)));
    }
}
