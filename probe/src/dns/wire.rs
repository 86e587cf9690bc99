//! DNS message encoding and decoding.
//!
//! Covers what the probe needs from RFC 1035: one-question recursive queries
//! out, and reply headers plus the answer section in. Names in replies may use
//! compression pointers anywhere.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

pub(crate) const HEADER_LEN: usize = 12;
pub(crate) const CLASS_IN: u16 = 1;

const MAX_NAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 63;
const MAX_POINTER_HOPS: usize = 64;

const FLAG_QR: u16 = 0x8000;
const FLAG_TC: u16 = 0x0200;
const FLAG_RD: u16 = 0x0100;
const RCODE_MASK: u16 = 0x000F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    A,
    Cname,
    Txt,
    Aaaa,
    Other(u16),
}

impl RecordType {
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::A => 1,
            Self::Cname => 5,
            Self::Txt => 16,
            Self::Aaaa => 28,
            Self::Other(code) => code,
        }
    }

    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::A,
            5 => Self::Cname,
            16 => Self::Txt,
            28 => Self::Aaaa,
            other => Self::Other(other),
        }
    }
}

/// Reply status from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl Rcode {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NxDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            other => Self::Other(other),
        }
    }

    #[cfg(test)]
    pub(crate) fn bits(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::FormErr => 1,
            Self::ServFail => 2,
            Self::NxDomain => 3,
            Self::NotImp => 4,
            Self::Refused => 5,
            Self::Other(bits) => bits,
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoError => f.write_str("NOERROR"),
            Self::FormErr => f.write_str("FORMERR"),
            Self::ServFail => f.write_str("SERVFAIL"),
            Self::NxDomain => f.write_str("NXDOMAIN"),
            Self::NotImp => f.write_str("NOTIMP"),
            Self::Refused => f.write_str("REFUSED"),
            Self::Other(bits) => write!(f, "RCODE{bits}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    /// Character-strings of one TXT record, in order.
    Txt(Vec<String>),
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub rtype: RecordType,
    pub ttl: u32,
    pub data: RecordData,
}

/// Decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u16,
    pub is_response: bool,
    /// The server set TC; the answer section may be incomplete.
    pub truncated: bool,
    pub rcode: Rcode,
    pub answers: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("cannot encode name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("message ends early at offset {0}")]
    ShortMessage(usize),
    #[error("unsupported label type at offset {0}")]
    BadLabel(usize),
    #[error("compression pointers loop at offset {0}")]
    PointerLoop(usize),
    #[error("name exceeds 255 bytes at offset {0}")]
    NameTooLong(usize),
    #[error("{rtype:?} record has malformed rdata")]
    BadRdata { rtype: RecordType },
}

/// Read the id from a buffer without decoding the rest.
pub(crate) fn peek_id(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_be_bytes([*bytes.first()?, *bytes.get(1)?]))
}

/// Build a recursive query for one name.
pub fn encode_query(id: u16, name: &str, rtype: RecordType) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::with_capacity(HEADER_LEN + name.len() + 6);
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&FLAG_RD.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    encode_name(name, &mut out)?;
    out.extend_from_slice(&rtype.code().to_be_bytes());
    out.extend_from_slice(&CLASS_IN.to_be_bytes());
    Ok(out)
}

pub(crate) fn encode_name(name: &str, out: &mut Vec<u8>) -> Result<(), WireError> {
    let invalid = |reason| WireError::InvalidName {
        name: name.to_string(),
        reason,
    };
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    let start = out.len();
    if !trimmed.is_empty() {
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(invalid("empty label"));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(invalid("label longer than 63 bytes"));
            }
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
    }
    out.push(0);
    if out.len() - start > MAX_NAME_LEN {
        out.truncate(start);
        return Err(invalid("name longer than 255 bytes"));
    }
    Ok(())
}

pub fn decode_message(bytes: &[u8]) -> Result<Message, WireError> {
    let mut reader = Reader::new(bytes);
    let id = reader.u16()?;
    let flags = reader.u16()?;
    let qdcount = reader.u16()?;
    let ancount = reader.u16()?;
    reader.skip(4)?;

    for _ in 0..qdcount {
        reader.name()?;
        reader.skip(4)?;
    }

    let mut answers = Vec::with_capacity(usize::from(ancount));
    for _ in 0..ancount {
        answers.push(reader.record()?);
    }

    Ok(Message {
        id,
        is_response: flags & FLAG_QR != 0,
        truncated: flags & FLAG_TC != 0,
        rcode: Rcode::from_bits((flags & RCODE_MASK) as u8),
        answers,
    })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).ok_or(WireError::ShortMessage(self.pos))?;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or(WireError::ShortMessage(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<(), WireError> {
        self.take(n).map(|_| ())
    }

    fn u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, WireError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn name(&mut self) -> Result<String, WireError> {
        let (name, next) = read_name(self.buf, self.pos)?;
        self.pos = next;
        Ok(name)
    }

    fn record(&mut self) -> Result<Record, WireError> {
        let name = self.name()?;
        let rtype = RecordType::from_code(self.u16()?);
        let _class = self.u16()?;
        let ttl = self.u32()?;
        let rdlength = usize::from(self.u16()?);
        let rdata_start = self.pos;
        let rdata = self.take(rdlength)?;

        let bad = || WireError::BadRdata { rtype };
        let data = match rtype {
            RecordType::A => {
                let octets: [u8; 4] = rdata.try_into().map_err(|_| bad())?;
                RecordData::A(Ipv4Addr::from(octets))
            }
            RecordType::Aaaa => {
                let octets: [u8; 16] = rdata.try_into().map_err(|_| bad())?;
                RecordData::Aaaa(Ipv6Addr::from(octets))
            }
            RecordType::Cname => {
                let (target, end) = read_name(self.buf, rdata_start)?;
                if end > self.pos {
                    return Err(bad());
                }
                RecordData::Cname(target)
            }
            RecordType::Txt => RecordData::Txt(character_strings(rdata).ok_or_else(bad)?),
            RecordType::Other(_) => RecordData::Raw(rdata.to_vec()),
        };

        Ok(Record {
            name,
            rtype,
            ttl,
            data,
        })
    }
}

/// Decode the name at `start`. Returns the dotted name (no trailing dot) and
/// the offset just past it in the message.
fn read_name(buf: &[u8], start: usize) -> Result<(String, usize), WireError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = start;
    let mut resume = None;
    let mut hops = 0;
    let mut encoded_len = 0;

    loop {
        let len = *buf.get(pos).ok_or(WireError::ShortMessage(pos))?;
        match len & 0xC0 {
            0x00 if len == 0 => {
                pos += 1;
                break;
            }
            0x00 => {
                let n = usize::from(len);
                let label = buf
                    .get(pos + 1..pos + 1 + n)
                    .ok_or(WireError::ShortMessage(pos))?;
                encoded_len += n + 1;
                if encoded_len > MAX_NAME_LEN {
                    return Err(WireError::NameTooLong(pos));
                }
                labels.push(String::from_utf8_lossy(label).into_owned());
                pos += 1 + n;
            }
            0xC0 => {
                let low = *buf.get(pos + 1).ok_or(WireError::ShortMessage(pos))?;
                if resume.is_none() {
                    resume = Some(pos + 2);
                }
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(WireError::PointerLoop(pos));
                }
                pos = (usize::from(len & 0x3F) << 8) | usize::from(low);
            }
            _ => return Err(WireError::BadLabel(pos)),
        }
    }

    Ok((labels.join("."), resume.unwrap_or(pos)))
}

fn character_strings(mut rdata: &[u8]) -> Option<Vec<String>> {
    let mut strings = Vec::new();
    while let Some((&len, rest)) = rdata.split_first() {
        let len = usize::from(len);
        let text = rest.get(..len)?;
        strings.push(String::from_utf8_lossy(text).into_owned());
        rdata = &rest[len..];
    }
    Some(strings)
}

/// Question of a query, for fake nameservers in tests.
#[cfg(test)]
pub(crate) fn decode_question(query: &[u8]) -> Result<(String, RecordType), WireError> {
    let (name, next) = read_name(query, HEADER_LEN)?;
    let code = query
        .get(next..next + 2)
        .ok_or(WireError::ShortMessage(next))?;
    Ok((name, RecordType::from_code(u16::from_be_bytes([code[0], code[1]]))))
}

/// Reply builder for fake nameservers in tests.
#[cfg(test)]
pub(crate) fn encode_reply(query: &[u8], rcode: Rcode, answers: &[RecordData]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&query[..2]);
    let flags = FLAG_QR | FLAG_RD | 0x0080 | u16::from(rcode.bits());
    out.extend_from_slice(&flags.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&query[HEADER_LEN..]);

    for data in answers {
        // Owner name points back at the question.
        out.extend_from_slice(&[0xC0, HEADER_LEN as u8]);
        let (rtype, rdata) = match data {
            RecordData::A(ip) => (RecordType::A, ip.octets().to_vec()),
            RecordData::Aaaa(ip) => (RecordType::Aaaa, ip.octets().to_vec()),
            RecordData::Cname(target) => {
                let mut buf = Vec::new();
                encode_name(target, &mut buf).expect("valid cname target");
                (RecordType::Cname, buf)
            }
            RecordData::Txt(strings) => {
                let mut buf = Vec::new();
                for s in strings {
                    buf.push(s.len() as u8);
                    buf.extend_from_slice(s.as_bytes());
                }
                (RecordType::Txt, buf)
            }
            RecordData::Raw(bytes) => (RecordType::Other(99), bytes.clone()),
        };
        out.extend_from_slice(&rtype.code().to_be_bytes());
        out.extend_from_slice(&CLASS_IN.to_be_bytes());
        out.extend_from_slice(&300u32.to_be_bytes());
        out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&rdata);
    }
    out
}
