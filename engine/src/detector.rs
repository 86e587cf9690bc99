//! Quiescence detection.
//!
//! A task pushes its discoveries before it is marked finished, and both go
//! through the queue lock. So once the queue is empty and no task is in
//! flight, nothing can ever push again.

use tokio::pin;
use tokio_util::sync::CancellationToken;

use crate::queue::WorkQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// The queue has items to dispatch.
    WorkAvailable,
    /// Queue empty and nothing in flight.
    Quiescent,
    Cancelled,
}

/// Wait until the queue either has work or is provably finished.
///
/// Registers for the change signal *before* inspecting the queue, so a push
/// or completion that lands between the check and the wait still wakes us.
/// Spurious wakeups just re-check.
pub(crate) async fn await_quiescence(queue: &WorkQueue, cancel: &CancellationToken) -> Verdict {
    loop {
        let changed = queue.changed().notified();
        pin!(changed);
        changed.as_mut().enable();

        let snapshot = queue.snapshot();
        if snapshot.pending > 0 {
            return Verdict::WorkAvailable;
        }
        if snapshot.in_flight == 0 {
            return Verdict::Quiescent;
        }

        tokio::select! {
            () = &mut changed => {}
            () = cancel.cancelled() => return Verdict::Cancelled,
        }
    }
}
