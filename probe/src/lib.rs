//! Network capabilities for delve.
//!
//! - **`NetworkProbe`**: resolves a name, asks the nameserver whether it
//!   exists, collects TXT records and fetches `http://<name>/`
//! - **`DirectorySink`**: persists bodies and TXT records per live name
//! - **`dns`**: the UDP stub resolver and wire codec behind the probe

pub mod dns;
mod http;
mod network;
mod settings;
mod sink;

use std::path::PathBuf;

pub use http::HttpFetcher;
pub use network::NetworkProbe;
pub use settings::{
    DEFAULT_DNS_ATTEMPTS, DEFAULT_DNS_TIMEOUT, DEFAULT_HTTP_PORT, DEFAULT_HTTP_TIMEOUT,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REDIRECTS, HttpSettings, ProbeSettings,
    parse_nameserver_arg,
};
pub use sink::{DirectorySink, TXT_SUFFIX};

/// Failures while building the probe, before any name is tried.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid nameserver address: {0:?} (expected ip or ip:port)")]
    InvalidNameserver(String),
    #[error("no nameserver found in {}; pass one explicitly", path.display())]
    NoNameserver { path: PathBuf },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
