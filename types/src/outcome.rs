//! What a probe learned about one name.

use std::net::IpAddr;

/// Result of fetching `http://<name>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    Response {
        status: u16,
        body: Vec<u8>,
        /// Body was cut at the configured byte cap.
        truncated: bool,
    },
    /// The name resolved but the request failed.
    Failed { error: String },
}

/// Observations for one fully-qualified name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Addresses the system resolver returned.
    pub addrs: Vec<IpAddr>,
    /// The authoritative answer was NOERROR (the name exists, maybe without records).
    pub exists: bool,
    /// CNAME target, if the nameserver returned one.
    pub cname: Option<String>,
    pub txt: Vec<String>,
    pub http: Option<HttpOutcome>,
}

impl ProbeOutcome {
    /// Nothing answered for this name.
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// The name exists in DNS, with no further detail.
    #[must_use]
    pub fn existing() -> Self {
        Self {
            exists: true,
            ..Self::default()
        }
    }

    /// Live names are worth expanding.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.exists || self.resolved()
    }

    #[must_use]
    pub fn resolved(&self) -> bool {
        !self.addrs.is_empty()
    }
}
