//! Result files: one per live name, plus one for its TXT records.

use std::path::{Path, PathBuf};

use delve_engine::{ProbeResult, Sink, SinkError, SinkFut};
use delve_types::{HttpOutcome, ProbeOutcome};
use delve_utils::{FileSyncPolicy, atomic_write, safe_file_name};
use tokio::fs;
use tokio::sync::OnceCell;
use tokio::task;
use tracing::debug;

/// Suffix appended to the file holding a name's TXT records.
pub const TXT_SUFFIX: &str = "-txt";

/// Writes `<dir>/<name>` (HTTP body or error text) and `<dir>/<name>-txt`.
///
/// The directory is created on the first write. Missing names and probe
/// errors produce no files.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    sync: FileSyncPolicy,
    created: OnceCell<()>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sync: FileSyncPolicy::default(),
            created: OnceCell::new(),
        }
    }

    pub fn with_sync(mut self, sync: FileSyncPolicy) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn ensure_dir(&self) -> Result<(), SinkError> {
        self.created
            .get_or_try_init(|| async {
                fs::create_dir_all(&self.dir)
                    .await
                    .map_err(|source| SinkError::Io {
                        path: self.dir.clone(),
                        source,
                    })
            })
            .await
            .map(|_| ())
    }

    async fn write(&self, file_name: String, bytes: Vec<u8>) -> Result<(), SinkError> {
        let path = self.dir.join(file_name);
        let sync = self.sync;
        let name = path.display().to_string();
        task::spawn_blocking(move || {
            let written = atomic_write(&path, &bytes, sync);
            written.map_err(|source| SinkError::Io { path, source })
        })
        .await
        .map_err(|e| SinkError::Rejected {
            name,
            message: format!("writer task failed: {e}"),
        })?
    }

    async fn record_outcome(&self, name: &str, outcome: &ProbeOutcome) -> Result<(), SinkError> {
        if !outcome.is_live() {
            return Ok(());
        }
        let body = match &outcome.http {
            Some(HttpOutcome::Response { body, .. }) => Some(body.clone()),
            Some(HttpOutcome::Failed { error }) => Some(error.clone().into_bytes()),
            None => None,
        };
        if body.is_none() && outcome.txt.is_empty() {
            return Ok(());
        }

        self.ensure_dir().await?;
        let file_name = safe_file_name(name);
        if let Some(body) = body {
            self.write(file_name.clone(), body).await?;
        }
        if !outcome.txt.is_empty() {
            let txt = outcome.txt.join("\n").into_bytes();
            self.write(format!("{file_name}{TXT_SUFFIX}"), txt).await?;
        }
        debug!(name, dir = %self.dir.display(), "Recorded result files");
        Ok(())
    }
}

impl Sink for DirectorySink {
    fn record<'a>(&'a self, name: &'a str, result: &'a ProbeResult) -> SinkFut<'a> {
        Box::pin(async move {
            match result {
                Ok(outcome) => self.record_outcome(name, outcome).await,
                Err(_) => Ok(()),
            }
        })
    }
}
