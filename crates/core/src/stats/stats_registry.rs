use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::dispatch::job_result::JobResult;

#[derive(Debug, Default)]
struct StatsCounters {
    frames_processed: u64,
    errors: u64,
    corrupted_frames: u64,
    pool_timeouts: u64,
    analysis_timeouts: u64,
    concurrent_requests: u64,
    max_concurrent: u64,
    last_analysis_time: Option<DateTime<Utc>>,
    verdicts: BTreeMap<String, u64>,
}

/// Point-in-time copy of the service counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub frames_processed: u64,
    pub errors: u64,
    pub corrupted_frames: u64,
    pub pool_timeouts: u64,
    pub analysis_timeouts: u64,
    pub concurrent_requests: u64,
    pub max_concurrent: u64,
    pub start_time: String,
    pub last_analysis_time: Option<String>,
    pub uptime_seconds: u64,
    pub verdicts: BTreeMap<String, u64>,
}

/// Process-wide request accounting.
///
/// All counters sit behind one mutex of their own; nothing here is ever
/// locked while an engine is being acquired.
#[derive(Debug)]
pub struct StatsRegistry {
    counters: Mutex<StatsCounters>,
    started: Instant,
    start_time: DateTime<Utc>,
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(StatsCounters::default()),
            started: Instant::now(),
            start_time: Utc::now(),
        }
    }

    /// Counts one more in-flight request until the guard drops.
    pub fn enter(&self) -> InFlight<'_> {
        let mut c = self.counters();
        c.concurrent_requests += 1;
        c.max_concurrent = c.max_concurrent.max(c.concurrent_requests);
        InFlight { registry: self }
    }

    pub fn record(&self, result: &JobResult) {
        let mut c = self.counters();
        match result {
            JobResult::Success(analysis) => {
                c.frames_processed += 1;
                c.last_analysis_time = Some(Utc::now());
                *c.verdicts
                    .entry(analysis.verdict_label().to_string())
                    .or_default() += 1;
            }
            JobResult::ValidationFailure(_) => c.corrupted_frames += 1,
            JobResult::EngineFailure(_) => c.errors += 1,
            JobResult::PoolTimeout => c.pool_timeouts += 1,
            JobResult::AnalysisTimeout => c.analysis_timeouts += 1,
        }
    }

    /// Counts a frame rejected before it became a job.
    pub fn record_corrupted_frame(&self) {
        self.counters().corrupted_frames += 1;
    }

    /// Counts an answer produced without running an engine.
    pub fn record_verdict(&self, label: &str) {
        *self.counters().verdicts.entry(label.to_string()).or_default() += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = self.counters();
        StatsSnapshot {
            frames_processed: c.frames_processed,
            errors: c.errors,
            corrupted_frames: c.corrupted_frames,
            pool_timeouts: c.pool_timeouts,
            analysis_timeouts: c.analysis_timeouts,
            concurrent_requests: c.concurrent_requests,
            max_concurrent: c.max_concurrent,
            start_time: self.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            last_analysis_time: c
                .last_analysis_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            uptime_seconds: self.started.elapsed().as_secs(),
            verdicts: c.verdicts.clone(),
        }
    }

    // A panic while holding the lock leaves plain counters, still usable.
    fn counters(&self) -> MutexGuard<'_, StatsCounters> {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// In-flight request marker; decrements the gauge on drop.
#[must_use = "the request stops counting as in flight when this is dropped"]
pub struct InFlight<'a> {
    registry: &'a StatsRegistry,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut c = self.registry.counters();
        c.concurrent_requests = c.concurrent_requests.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::analysis::{AiDetection, Analysis};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fresh_registry_is_zeroed() {
        let snap = StatsRegistry::new().snapshot();
        assert_eq!(snap.frames_processed, 0);
        assert_eq!(snap.max_concurrent, 0);
        assert!(snap.last_analysis_time.is_none());
        assert!(snap.verdicts.is_empty());
    }

    #[test]
    fn test_in_flight_guard_tracks_peak() {
        let stats = StatsRegistry::new();
        {
            let _a = stats.enter();
            let _b = stats.enter();
            assert_eq!(stats.snapshot().concurrent_requests, 2);
        }
        let _c = stats.enter();
        let snap = stats.snapshot();
        assert_eq!(snap.concurrent_requests, 1);
        assert_eq!(snap.max_concurrent, 2);
    }

    #[test]
    fn test_record_routes_each_outcome() {
        let stats = StatsRegistry::new();
        stats.record(&JobResult::Success(Analysis::AiDetection(AiDetection::no_face())));
        stats.record(&JobResult::EngineFailure("boom".into()));
        stats.record(&JobResult::ValidationFailure("bad".into()));
        stats.record(&JobResult::PoolTimeout);
        stats.record(&JobResult::AnalysisTimeout);
        stats.record(&JobResult::AnalysisTimeout);

        let snap = stats.snapshot();
        assert_eq!(snap.frames_processed, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.corrupted_frames, 1);
        assert_eq!(snap.pool_timeouts, 1);
        assert_eq!(snap.analysis_timeouts, 2);
        assert_eq!(snap.verdicts.get("no_face"), Some(&1));
        assert!(snap.last_analysis_time.is_some());
    }

    #[test]
    fn test_corrupted_frame_leaves_processed_untouched() {
        let stats = StatsRegistry::new();
        stats.record_corrupted_frame();
        let snap = stats.snapshot();
        assert_eq!(snap.corrupted_frames, 1);
        assert_eq!(snap.frames_processed, 0);
        assert_eq!(snap.errors, 0);
    }

    #[test]
    fn test_max_concurrent_equals_true_peak_under_contention() {
        let stats = Arc::new(StatsRegistry::new());
        let barrier = Arc::new(std::sync::Barrier::new(6));
        let threads: Vec<_> = (0..6)
            .map(|_| {
                let stats = Arc::clone(&stats);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let _guard = stats.enter();
                    barrier.wait();
                    thread::sleep(Duration::from_millis(5));
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        let snap = stats.snapshot();
        assert_eq!(snap.max_concurrent, 6);
        assert_eq!(snap.concurrent_requests, 0);
    }

    #[test]
    fn test_max_concurrent_never_decreases() {
        let stats = StatsRegistry::new();
        let mut last = 0;
        for burst in [3, 1, 4, 1, 5, 2] {
            let guards: Vec<_> = (0..burst).map(|_| stats.enter()).collect();
            let peak = stats.snapshot().max_concurrent;
            assert!(peak >= last);
            last = peak;
            drop(guards);
        }
        assert_eq!(last, 5);
    }
}
