//! Exploration engine for delve: a bounded-concurrency work queue that grows
//! while it is being drained.
//!
//! ```text
//!   wordlist x delimiters
//!           │ generate_permutations
//!           ▼
//!     ┌───────────┐ reserve  ┌────────────┐ acquire ┌──────────┐
//!     │ WorkQueue │────────▶│ dispatcher │───────▶│ Admission │
//!     └───────────┘          └────────────┘         └──────────┘
//!           ▲                      │ spawn
//!           │ extend (live)        ▼
//!           └──────────────── task: Probe ─▶ Sink
//! ```
//!
//! The run ends when the queue is empty and no task is in flight, or when the
//! caller's [`CancellationToken`] fires.

mod admission;
mod capability;
mod detector;
mod dispatch;
mod permute;
mod queue;
mod report;


pub use admission::{Admission, AdmissionToken};
pub use capability::{NullSink, Probe, ProbeError, ProbeFut, ProbeResult, Sink, SinkError, SinkFut};
pub use dispatch::Explorer;
pub use permute::{generate_permutations, permutation_count};
pub use queue::{QueueSnapshot, WorkQueue};
pub use report::RunReport;
pub use tokio_util::sync::CancellationToken;

/// Fatal dispatcher failures. Probe and sink errors are counted, not raised.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("admission limiter closed while the dispatcher was running")]
    AdmissionClosed,
}
