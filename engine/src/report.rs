//! Run counters and the final summary.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters updated concurrently by tasks.
#[derive(Debug, Default)]
pub(crate) struct RunStats {
    pub(crate) dispatched: AtomicU64,
    pub(crate) live: AtomicU64,
    pub(crate) expanded: AtomicU64,
    pub(crate) probe_errors: AtomicU64,
    pub(crate) sink_errors: AtomicU64,
    pub(crate) task_panics: AtomicU64,
}

impl RunStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Summary returned once the explorer stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Initial candidates accepted into the queue.
    pub seeded: usize,
    /// Tasks launched.
    pub dispatched: u64,
    /// Probes whose outcome was live.
    pub live: u64,
    /// Candidates enqueued by expansion.
    pub expanded: u64,
    /// Pushes rejected by deduplication.
    pub duplicates: u64,
    pub probe_errors: u64,
    pub sink_errors: u64,
    pub task_panics: u64,
    /// Most admission units held at once.
    pub peak_in_flight: usize,
    /// Items left in the queue. Non-zero only after cancellation.
    pub pending: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} probed ({} seeded, {} from expansion), {} live, {} probe errors",
            self.dispatched, self.seeded, self.expanded, self.live, self.probe_errors
        )?;
        if self.sink_errors > 0 {
            write!(f, ", {} sink errors", self.sink_errors)?;
        }
        if self.duplicates > 0 {
            write!(f, ", {} duplicates skipped", self.duplicates)?;
        }
        if self.task_panics > 0 {
            write!(f, ", {} tasks panicked", self.task_panics)?;
        }
        if self.cancelled {
            write!(f, ", cancelled with {} pending", self.pending)?;
        }
        write!(f, " in {:.1}s", self.elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        RunReport {
            seeded: 12,
            dispatched: 14,
            live: 1,
            expanded: 2,
            duplicates: 0,
            probe_errors: 0,
            sink_errors: 0,
            task_panics: 0,
            peak_in_flight: 4,
            pending: 0,
            cancelled: false,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn display_omits_zero_optional_counters() {
        assert_eq!(
            report().to_string(),
            "14 probed (12 seeded, 2 from expansion), 1 live, 0 probe errors in 1.5s"
        );
    }

    #[test]
    fn display_mentions_cancellation() {
        let report = RunReport {
            cancelled: true,
            pending: 7,
            ..report()
        };
        assert!(report.to_string().contains("cancelled with 7 pending"));
    }
}
