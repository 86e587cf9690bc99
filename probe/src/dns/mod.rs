//! Minimal stub resolver: one question per UDP exchange against a fixed
//! nameserver.

mod resolv_conf;
mod wire;

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

pub use resolv_conf::{DNS_PORT, RESOLV_CONF, first_nameserver, nameservers, parse_nameserver};
pub use wire::{
    Message, Rcode, Record, RecordData, RecordType, WireError, decode_message, encode_query,
};

/// Largest reply we accept over UDP (EDNS-sized).
const RECV_BUFFER: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error(transparent)]
    Encode(#[from] WireError),
    #[error("UDP exchange with {server} failed: {source}")]
    Io { server: SocketAddr, source: io::Error },
    #[error("no reply from {server} after {attempts} attempt(s)")]
    Timeout { server: SocketAddr, attempts: u32 },
    #[error("malformed reply from {server}: {source}")]
    Malformed {
        server: SocketAddr,
        source: WireError,
    },
}

#[derive(Debug, Clone)]
pub struct DnsClient {
    server: SocketAddr,
    timeout: Duration,
    attempts: u32,
}

impl DnsClient {
    #[must_use]
    pub fn new(server: SocketAddr, timeout: Duration, attempts: u32) -> Self {
        Self {
            server,
            timeout,
            attempts: attempts.max(1),
        }
    }

    #[must_use]
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Ask one question. Each attempt uses a fresh random id; replies carrying
    /// another id are ignored until the attempt times out.
    pub async fn query(&self, name: &str, rtype: RecordType) -> Result<Message, DnsError> {
        let io_err = |source: io::Error| DnsError::Io {
            server: self.server,
            source,
        };
        let local: SocketAddr = if self.server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await.map_err(io_err)?;
        socket.connect(self.server).await.map_err(io_err)?;

        for attempt in 1..=self.attempts {
            let id: u16 = rand::random();
            let query = encode_query(id, name, rtype)?;
            socket.send(&query).await.map_err(io_err)?;

            if let Ok(reply) = timeout(self.timeout, self.recv_reply(&socket, id)).await {
                return reply;
            }
            debug!(name, ?rtype, attempt, "DNS query timed out");
        }

        Err(DnsError::Timeout {
            server: self.server,
            attempts: self.attempts,
        })
    }

    async fn recv_reply(&self, socket: &UdpSocket, id: u16) -> Result<Message, DnsError> {
        let mut buf = vec![0u8; RECV_BUFFER];
        loop {
            let len = socket.recv(&mut buf).await.map_err(|source| DnsError::Io {
                server: self.server,
                source,
            })?;
            let bytes = &buf[..len];
            if wire::peek_id(bytes) != Some(id) {
                trace!(expected = id, "Ignoring reply with foreign id");
                continue;
            }
            match decode_message(bytes) {
                Ok(message) if message.is_response => return Ok(message),
                Ok(_) => trace!("Ignoring non-response datagram"),
                Err(source) => {
                    return Err(DnsError::Malformed {
                        server: self.server,
                        source,
                    });
                }
            }
        }
    }
}
