//! Resolved probe settings: config values with defaults applied.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use delve_config::ProbeConfig;

use crate::SetupError;
use crate::dns::{RESOLV_CONF, first_nameserver, parse_nameserver};

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_DNS_ATTEMPTS: u32 = 2;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub port: u16,
    pub max_redirects: usize,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            port: DEFAULT_HTTP_PORT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: default_user_agent(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// `None` means "first nameserver in resolv.conf".
    pub nameserver: Option<SocketAddr>,
    pub dns_timeout: Duration,
    pub dns_attempts: u32,
    /// `None` disables the HTTP fetch.
    pub http: Option<HttpSettings>,
    pub txt: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            nameserver: None,
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            dns_attempts: DEFAULT_DNS_ATTEMPTS,
            http: Some(HttpSettings::default()),
            txt: true,
        }
    }
}

impl ProbeSettings {
    pub fn from_config(config: Option<&ProbeConfig>) -> Result<Self, SetupError> {
        let Some(config) = config else {
            return Ok(Self::default());
        };

        let nameserver = config
            .nameserver
            .as_deref()
            .map(parse_nameserver_arg)
            .transpose()?;

        let http = config.http.then(|| HttpSettings {
            timeout: config
                .http_timeout_seconds
                .map_or(DEFAULT_HTTP_TIMEOUT, Duration::from_secs),
            port: config.http_port.unwrap_or(DEFAULT_HTTP_PORT),
            max_redirects: config.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
            user_agent: config
                .user_agent
                .clone()
                .unwrap_or_else(default_user_agent),
            max_body_bytes: config.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        });

        Ok(Self {
            nameserver,
            dns_timeout: config
                .dns_timeout_ms
                .map_or(DEFAULT_DNS_TIMEOUT, Duration::from_millis),
            dns_attempts: DEFAULT_DNS_ATTEMPTS,
            http,
            txt: config.txt,
        })
    }

    /// The configured nameserver, or the system one.
    pub fn resolve_nameserver(&self) -> Result<SocketAddr, SetupError> {
        self.resolve_nameserver_from(Path::new(RESOLV_CONF))
    }

    pub(crate) fn resolve_nameserver_from(&self, resolv_conf: &Path) -> Result<SocketAddr, SetupError> {
        if let Some(addr) = self.nameserver {
            return Ok(addr);
        }
        first_nameserver(resolv_conf).ok_or_else(|| SetupError::NoNameserver {
            path: resolv_conf.to_path_buf(),
        })
    }
}

/// Parse a user-supplied nameserver (`ip` or `ip:port`).
pub fn parse_nameserver_arg(raw: &str) -> Result<SocketAddr, SetupError> {
    parse_nameserver(raw).ok_or_else(|| SetupError::InvalidNameserver(raw.to_string()))
}

fn default_user_agent() -> String {
    format!("delve/{}", env!("CARGO_PKG_VERSION"))
}
