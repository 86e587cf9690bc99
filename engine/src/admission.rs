//! Fixed-capacity admission control for probe tasks.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::EngineError;

/// Counting limiter: at most `capacity` tokens are outstanding at once.
#[derive(Debug)]
pub struct Admission {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    peak: AtomicUsize,
}

/// One unit of capacity. Dropping it releases the unit.
#[derive(Debug)]
pub struct AdmissionToken {
    _permit: OwnedSemaphorePermit,
}

impl Admission {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.get())),
            capacity: capacity.get(),
            peak: AtomicUsize::new(0),
        }
    }

    /// Wait until a unit is free.
    ///
    /// The semaphore is never closed while the limiter is alive; a closed
    /// semaphore means the accounting is broken and is reported as fatal.
    pub async fn acquire(&self) -> Result<AdmissionToken, EngineError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| EngineError::AdmissionClosed)?;
        self.peak.fetch_max(self.in_use(), Ordering::Relaxed);
        Ok(AdmissionToken { _permit: permit })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Highest [`in_use`](Self::in_use) observed right after an acquisition.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn close(&self) {
        self.semaphore.close();
    }
}
