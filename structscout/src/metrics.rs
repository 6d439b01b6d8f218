use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counts structural search requests per matcher.
///
/// Labels are the matcher id when it came from an explicit language
/// (`.go`) and `inferred:<id>` when it was derived from a file extension or
/// fell back to the generic matcher. Clones share the same counters, so one
/// instance can be handed to every search a process runs.
#[derive(Debug, Clone, Default)]
pub struct MatcherMetrics {
    requests: Arc<DashMap<String, AtomicU64>>,
    prefilter_skips: Arc<AtomicU64>,
}

impl MatcherMetrics {
    /// Creates a new MatcherMetrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one structural search request for `label`
    pub fn record_request(&self, label: &str) {
        let total = match self.requests.get(label) {
            Some(counter) => counter.fetch_add(1, Ordering::Relaxed) + 1,
            None => self
                .requests
                .entry(label.to_string())
                .or_default()
                .fetch_add(1, Ordering::Relaxed)
                + 1,
        };
        debug!("Structural search request for matcher {}: {} total", label, total);
    }

    /// Records a structural search that the regex pre-filter answered without
    /// starting the matcher
    pub fn record_prefilter_skip(&self) {
        self.prefilter_skips.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests recorded for `label`
    pub fn requests(&self, label: &str) -> u64 {
        self.requests
            .get(label)
            .map_or(0, |counter| counter.load(Ordering::Relaxed))
    }

    /// Structural searches skipped by the pre-filter
    pub fn prefilter_skips(&self) -> u64 {
        self.prefilter_skips.load(Ordering::Relaxed)
    }

    /// Snapshot of every label and its count, sorted by label
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut counts: Vec<(String, u64)> = self
            .requests
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        counts.sort();
        counts
    }

    /// Logs the current request counts
    pub fn log_stats(&self) {
        for (label, count) in self.snapshot() {
            info!("Structural search requests for {}: {}", label, count);
        }
        info!(
            "Structural searches skipped by pre-filter: {}",
            self.prefilter_skips()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counting() {
        let metrics = MatcherMetrics::new();
        metrics.record_request(".go");
        metrics.record_request(".go");
        metrics.record_request("inferred:.generic");

        assert_eq!(metrics.requests(".go"), 2);
        assert_eq!(metrics.requests("inferred:.generic"), 1);
        assert_eq!(metrics.requests(".rs"), 0);
        assert_eq!(
            metrics.snapshot(),
            vec![
                (".go".to_string(), 2),
                ("inferred:.generic".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = MatcherMetrics::new();
        let clone = metrics.clone();
        clone.record_request(".rs");
        clone.record_prefilter_skip();

        assert_eq!(metrics.requests(".rs"), 1);
        assert_eq!(metrics.prefilter_skips(), 1);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = MatcherMetrics::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        metrics.record_request(".py");
                    }
                });
            }
        });
        assert_eq!(metrics.requests(".py"), 400);
    }
}
