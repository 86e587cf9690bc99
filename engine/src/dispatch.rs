//! The dispatcher loop and the per-candidate task body.

use std::sync::Arc;
use std::time::Instant;

use delve_types::{Candidate, Domain, ExploreSettings, Wordlist};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::admission::{Admission, AdmissionToken};
use crate::capability::{Probe, Sink};
use crate::detector::{Verdict, await_quiescence};
use crate::permute::generate_permutations;
use crate::queue::WorkQueue;
use crate::report::{RunReport, RunStats};
use crate::EngineError;

/// Log a progress line every this many dispatches.
const PROGRESS_INTERVAL: u64 = 1000;

/// Drives one exploration: seeds the queue, dispatches probes under the
/// admission limit, expands live names, and stops at quiescence.
pub struct Explorer {
    probe: Arc<dyn Probe>,
    sink: Arc<dyn Sink>,
    settings: ExploreSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Draining,
    Checking,
}

#[derive(Debug)]
enum Stop {
    Quiescent,
    Cancelled,
    Failed(EngineError),
}

/// Everything a task needs, shared by reference.
struct TaskContext {
    probe: Arc<dyn Probe>,
    sink: Arc<dyn Sink>,
    wordlist: Wordlist,
    domain: Domain,
    queue: Arc<WorkQueue>,
    stats: Arc<RunStats>,
    cancel: CancellationToken,
}

/// Holds one admission unit and one queue reservation for a task's lifetime.
///
/// Dropping it marks the task finished before the unit is returned, on every
/// exit path including panics and tasks that never got polled.
struct TaskGuard {
    queue: Arc<WorkQueue>,
    _token: AdmissionToken,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.queue.finish();
    }
}

impl Explorer {
    #[must_use]
    pub fn new(probe: Arc<dyn Probe>, sink: Arc<dyn Sink>, settings: ExploreSettings) -> Self {
        Self {
            probe,
            sink,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ExploreSettings {
        &self.settings
    }

    /// Run until quiescence or cancellation.
    ///
    /// On cancellation no new probes start, in-flight probes are abandoned at
    /// their next await point, and the report carries `cancelled = true`.
    pub async fn run(
        &self,
        wordlist: Wordlist,
        domain: Domain,
        cancel: CancellationToken,
    ) -> Result<RunReport, EngineError> {
        let started = Instant::now();
        let cancel = cancel.child_token();

        let queue = Arc::new(WorkQueue::new(self.settings.dedupe));
        let seeded = queue.extend(generate_permutations(&wordlist, &self.settings.delimiters));
        let admission = Admission::new(self.settings.concurrency);
        let stats = Arc::new(RunStats::default());

        info!(
            domain = %domain,
            seeded,
            concurrency = admission.capacity(),
            dedupe = self.settings.dedupe,
            "Starting exploration"
        );

        let ctx = Arc::new(TaskContext {
            probe: Arc::clone(&self.probe),
            sink: Arc::clone(&self.sink),
            wordlist,
            domain,
            queue: Arc::clone(&queue),
            stats: Arc::clone(&stats),
            cancel: cancel.clone(),
        });

        let mut tasks = JoinSet::new();
        let mut phase = Phase::Draining;

        let stop = loop {
            while let Some(joined) = tasks.try_join_next() {
                note_join(joined, &stats);
            }
            if cancel.is_cancelled() {
                break Stop::Cancelled;
            }

            match phase {
                Phase::Draining => {
                    let Some(candidate) = queue.reserve() else {
                        phase = Phase::Checking;
                        continue;
                    };
                    let token = tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            queue.unreserve(candidate);
                            break Stop::Cancelled;
                        }
                        token = admission.acquire() => token,
                    };
                    let token = match token {
                        Ok(token) => token,
                        Err(err) => {
                            queue.unreserve(candidate);
                            break Stop::Failed(err);
                        }
                    };
                    let guard = TaskGuard {
                        queue: Arc::clone(&queue),
                        _token: token,
                    };

                    RunStats::bump(&stats.dispatched);
                    let dispatched = RunStats::get(&stats.dispatched);
                    if dispatched % PROGRESS_INTERVAL == 0 {
                        info!(
                            dispatched,
                            pending = queue.len(),
                            in_flight = admission.in_use(),
                            live = RunStats::get(&stats.live),
                            "Progress"
                        );
                    }

                    tasks.spawn(run_task(Arc::clone(&ctx), candidate, guard));
                }
                Phase::Checking => match await_quiescence(&queue, &cancel).await {
                    Verdict::WorkAvailable => phase = Phase::Draining,
                    Verdict::Quiescent => break Stop::Quiescent,
                    Verdict::Cancelled => break Stop::Cancelled,
                },
            }
        };

        match &stop {
            Stop::Quiescent => debug!("Queue quiescent"),
            Stop::Cancelled => info!(
                in_flight = admission.in_use(),
                "Cancellation requested; waiting for in-flight probes"
            ),
            Stop::Failed(err) => {
                error!("Dispatcher stopped: {err}");
                cancel.cancel();
            }
        }

        while let Some(joined) = tasks.join_next().await {
            note_join(joined, &stats);
        }

        let report = RunReport {
            seeded,
            dispatched: RunStats::get(&stats.dispatched),
            live: RunStats::get(&stats.live),
            expanded: RunStats::get(&stats.expanded),
            duplicates: queue.duplicates(),
            probe_errors: RunStats::get(&stats.probe_errors),
            sink_errors: RunStats::get(&stats.sink_errors),
            task_panics: RunStats::get(&stats.task_panics),
            peak_in_flight: admission.peak(),
            pending: queue.len(),
            cancelled: matches!(stop, Stop::Cancelled),
            elapsed: started.elapsed(),
        };

        match stop {
            Stop::Failed(err) => Err(err),
            Stop::Quiescent | Stop::Cancelled => {
                info!(
                    dispatched = report.dispatched,
                    live = report.live,
                    cancelled = report.cancelled,
                    "Exploration finished"
                );
                Ok(report)
            }
        }
    }
}

fn note_join(joined: Result<(), JoinError>, stats: &RunStats) {
    match joined {
        Ok(()) => {}
        Err(err) if err.is_panic() => {
            RunStats::bump(&stats.task_panics);
            error!("Probe task panicked: {err}");
        }
        Err(err) => debug!("Probe task cancelled: {err}"),
    }
}

/// Probe one candidate, record the result, and expand it when live.
async fn run_task(ctx: Arc<TaskContext>, candidate: Candidate, guard: TaskGuard) {
    let _guard = guard;
    let name = candidate.qualify(&ctx.domain);

    let result = tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => {
            debug!(name = %name, "Probe abandoned on cancellation");
            return;
        }
        result = ctx.probe.probe(&name) => result,
    };

    let live = match &result {
        Ok(outcome) => outcome.is_live(),
        Err(err) => {
            RunStats::bump(&ctx.stats.probe_errors);
            warn!(name = %name, "Probe failed: {err}");
            false
        }
    };

    if let Err(err) = ctx.sink.record(&name, &result).await {
        RunStats::bump(&ctx.stats.sink_errors);
        warn!(name = %name, "Failed to record result: {err}");
    }

    if !live {
        debug!(name = %name, "Not live");
        return;
    }

    RunStats::bump(&ctx.stats.live);
    let enqueued = ctx
        .queue
        .extend(ctx.wordlist.iter().map(|word| candidate.child(word)));
    RunStats::add(&ctx.stats.expanded, enqueued as u64);
    info!(name = %name, enqueued, "Live name; searching deeper");
}
