//! Shared test utilities and fixtures
//!
//! A tiny authoritative nameserver on loopback and wordlist helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

const TYPE_TXT: u16 = 16;
const RCODE_NXDOMAIN: u8 = 3;

/// Names that exist, each with its TXT strings.
#[derive(Debug, Clone, Default)]
pub struct Zone {
    names: HashMap<String, Vec<String>>,
}

impl Zone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, txt: &[&str]) -> Self {
        self.names.insert(
            name.to_ascii_lowercase(),
            txt.iter().map(ToString::to_string).collect(),
        );
        self
    }
}

/// Answers every question from a [`Zone`]: NOERROR for names in it,
/// NXDOMAIN otherwise.
pub struct ZoneServer {
    pub addr: SocketAddr,
    queries: Arc<Mutex<Vec<(String, u16)>>>,
    task: JoinHandle<()>,
}

impl ZoneServer {
    pub async fn start(zone: Zone) -> Self {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let queries = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&queries);

        let task = tokio::spawn(async move {
            let mut buf = [0u8; 512];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Some(question) = Question::parse(&buf[..len]) else {
                    continue;
                };
                log.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((question.name.clone(), question.qtype));
                let reply = question.answer(&buf[..len], &zone);
                let _ = socket.send_to(&reply, peer).await;
            }
        });

        Self {
            addr,
            queries,
            task,
        }
    }

    /// Every `(name, qtype)` asked so far.
    pub fn queries(&self) -> Vec<(String, u16)> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn asked(&self, name: &str) -> bool {
        self.queries().iter().any(|(n, _)| n == name)
    }
}

impl Drop for ZoneServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Question {
    name: String,
    qtype: u16,
    /// Offset just past the question section.
    end: usize,
}

impl Question {
    /// Queries are never compressed, so labels can be read straight through.
    fn parse(query: &[u8]) -> Option<Self> {
        let mut pos = 12;
        let mut labels = Vec::new();
        loop {
            let len = usize::from(*query.get(pos)?);
            pos += 1;
            if len == 0 {
                break;
            }
            let label = query.get(pos..pos + len)?;
            labels.push(String::from_utf8_lossy(label).to_ascii_lowercase());
            pos += len;
        }
        let qtype = u16::from_be_bytes([*query.get(pos)?, *query.get(pos + 1)?]);
        Some(Self {
            name: labels.join("."),
            qtype,
            end: pos + 4,
        })
    }

    fn answer(&self, query: &[u8], zone: &Zone) -> Vec<u8> {
        let (rcode, txt) = match zone.names.get(&self.name) {
            Some(txt) if self.qtype == TYPE_TXT => (0, txt.as_slice()),
            Some(_) => (0, &[][..]),
            None => (RCODE_NXDOMAIN, &[][..]),
        };

        let mut out = Vec::with_capacity(self.end + 64);
        out.extend_from_slice(&query[..2]);
        // QR, RD echoed, RA.
        out.push(0x80 | (query[2] & 0x01));
        out.push(0x80 | rcode);
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&(txt.len() as u16).to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]);
        out.extend_from_slice(&query[12..self.end]);

        for text in txt {
            let bytes = text.as_bytes();
            // Pointer back to the question name.
            out.extend_from_slice(&[0xC0, 0x0C]);
            out.extend_from_slice(&TYPE_TXT.to_be_bytes());
            out.extend_from_slice(&1u16.to_be_bytes());
            out.extend_from_slice(&60u32.to_be_bytes());
            out.extend_from_slice(&((bytes.len() + 1) as u16).to_be_bytes());
            out.push(bytes.len() as u8);
            out.extend_from_slice(bytes);
        }
        out
    }
}

/// Write `words` one per line to `<dir>/words.txt`.
pub fn write_wordlist(dir: &Path, words: &[&str]) -> PathBuf {
    let path = dir.join("words.txt");
    fs::write(&path, words.join("\n")).unwrap();
    path
}

/// Write `text` to `<dir>/config.toml` so runs never pick up the user's config.
pub fn write_config(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, text).unwrap();
    path
}
