//! Injected capabilities: the probe that tests a name and the sink that
//! records what was learned.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use delve_types::ProbeOutcome;

/// Probe future type alias.
pub type ProbeFut<'a> = Pin<Box<dyn Future<Output = Result<ProbeOutcome, ProbeError>> + Send + 'a>>;

/// Sink future type alias.
pub type SinkFut<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// Result handed to the sink for every dispatched name.
pub type ProbeResult = Result<ProbeOutcome, ProbeError>;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe failed for {name}: {message}")]
    Failed { name: String, message: String },
}

impl ProbeError {
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("sink rejected {name}: {message}")]
    Rejected { name: String, message: String },
}

/// Tests one fully-qualified name.
///
/// Called concurrently from up to `concurrency` tasks. A returned error is
/// logged and counted; it never triggers expansion.
pub trait Probe: Send + Sync {
    fn probe<'a>(&'a self, name: &'a str) -> ProbeFut<'a>;
}

/// Records the result of every probe, successful or not.
///
/// A slow sink throttles effective concurrency: the admission unit is held
/// until `record` returns.
pub trait Sink: Send + Sync {
    fn record<'a>(&'a self, name: &'a str, result: &'a ProbeResult) -> SinkFut<'a>;
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl Sink for NullSink {
    fn record<'a>(&'a self, _name: &'a str, _result: &'a ProbeResult) -> SinkFut<'a> {
        Box::pin(async { Ok(()) })
    }
}
