//! Nameserver discovery and address parsing.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use tracing::warn;

pub const DNS_PORT: u16 = 53;
pub const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Parse `ip`, `ip:port`, `[v6]:port` or a bare IPv6 address.
/// Zone suffixes (`fe80::1%eth0`) are dropped.
#[must_use]
pub fn parse_nameserver(raw: &str) -> Option<SocketAddr> {
    let raw = raw.trim();
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Some(addr);
    }
    let host = raw.split('%').next().unwrap_or(raw);
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
}

/// `nameserver` entries in file order.
#[must_use]
pub fn nameservers(resolv_conf: &str) -> Vec<SocketAddr> {
    resolv_conf
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("nameserver"), Some(addr)) => parse_nameserver(addr),
                _ => None,
            }
        })
        .collect()
}

/// First nameserver listed in the given resolv.conf.
pub fn first_nameserver(path: &Path) -> Option<SocketAddr> {
    match fs::read_to_string(path) {
        Ok(text) => nameservers(&text).into_iter().next(),
        Err(e) => {
            warn!(path = %path.display(), "Failed to read resolver config: {e}");
            None
        }
    }
}
