//! Shared FIFO of pending candidates.
//!
//! Pending items and the number of reserved (dispatched but unfinished) tasks
//! live under one lock, so "nothing pending and nothing running" is observed
//! atomically. Every push and every task completion signals [`WorkQueue::changed`].

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use delve_types::Candidate;
use tokio::sync::Notify;

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub in_flight: usize,
}

impl QueueSnapshot {
    /// No pending work and no task that could still push more.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.pending == 0 && self.in_flight == 0
    }
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<Candidate>,
    /// Every candidate ever accepted, when deduplicating.
    seen: Option<HashSet<Candidate>>,
    in_flight: usize,
    duplicates: u64,
}

impl QueueState {
    fn accept(&mut self, candidate: Candidate) -> bool {
        if let Some(seen) = self.seen.as_mut()
            && !seen.insert(candidate.clone())
        {
            self.duplicates += 1;
            return false;
        }
        self.items.push_back(candidate);
        true
    }
}

#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    changed: Notify,
}

impl WorkQueue {
    #[must_use]
    pub fn new(dedupe: bool) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                seen: dedupe.then(HashSet::new),
                in_flight: 0,
                duplicates: 0,
            }),
            changed: Notify::new(),
        }
    }

    // Critical sections never panic, so a poisoned lock still holds consistent data.
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one candidate. Returns `false` when deduplication rejected it.
    pub fn push(&self, candidate: Candidate) -> bool {
        let accepted = self.state().accept(candidate);
        if accepted {
            self.changed.notify_one();
        }
        accepted
    }

    /// Append many candidates under one lock. Returns how many were accepted.
    pub fn extend<I>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut accepted = 0;
        {
            let mut state = self.state();
            for candidate in candidates {
                if state.accept(candidate) {
                    accepted += 1;
                }
            }
        }
        if accepted > 0 {
            self.changed.notify_one();
        }
        accepted
    }

    /// Remove and return the oldest candidate without blocking.
    pub fn try_pop(&self) -> Option<Candidate> {
        self.state().items.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    /// Pushes rejected as already seen.
    #[must_use]
    pub fn duplicates(&self) -> u64 {
        self.state().duplicates
    }

    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.state();
        QueueSnapshot {
            pending: state.items.len(),
            in_flight: state.in_flight,
        }
    }

    /// Signalled on every accepted push and every finished task.
    pub(crate) fn changed(&self) -> &Notify {
        &self.changed
    }

    /// Pop the oldest candidate and count it as in flight, atomically.
    pub(crate) fn reserve(&self) -> Option<Candidate> {
        let mut state = self.state();
        let candidate = state.items.pop_front()?;
        state.in_flight += 1;
        Some(candidate)
    }

    /// Undo a [`reserve`](Self::reserve) whose task never started.
    pub(crate) fn unreserve(&self, candidate: Candidate) {
        {
            let mut state = self.state();
            state.items.push_front(candidate);
            state.in_flight = release_one(state.in_flight);
        }
        self.changed.notify_one();
    }

    /// Mark a reserved task as done. Any pushes it made are already visible.
    pub(crate) fn finish(&self) {
        {
            let mut state = self.state();
            state.in_flight = release_one(state.in_flight);
        }
        self.changed.notify_one();
    }
}

fn release_one(in_flight: usize) -> usize {
    debug_assert!(in_flight > 0, "task released without a reservation");
    if in_flight == 0 {
        tracing::error!("Task released without a reservation; in-flight accounting is corrupt");
    }
    in_flight.saturating_sub(1)
}
