//! The production probe: system resolver, direct DNS questions, HTTP.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use delve_engine::{Probe, ProbeError, ProbeFut};
use delve_types::{HttpOutcome, ProbeOutcome};
use tokio::net::lookup_host;
use tracing::{debug, trace};

use crate::SetupError;
use crate::dns::{DnsClient, DnsError, Message, Rcode, RecordData, RecordType};
use crate::http::HttpFetcher;
use crate::settings::ProbeSettings;

pub struct NetworkProbe {
    dns: DnsClient,
    http: Option<HttpFetcher>,
    txt: bool,
}

impl NetworkProbe {
    pub fn new(settings: &ProbeSettings) -> Result<Self, SetupError> {
        let nameserver = settings.resolve_nameserver()?;
        Self::with_nameserver(settings, nameserver)
    }

    pub(crate) fn with_nameserver(
        settings: &ProbeSettings,
        nameserver: SocketAddr,
    ) -> Result<Self, SetupError> {
        let http = settings.http.as_ref().map(HttpFetcher::new).transpose()?;
        debug!(
            %nameserver,
            http = http.is_some(),
            txt = settings.txt,
            "Network probe ready"
        );
        Ok(Self {
            dns: DnsClient::new(nameserver, settings.dns_timeout, settings.dns_attempts),
            http,
            txt: settings.txt,
        })
    }

    #[must_use]
    pub fn nameserver(&self) -> SocketAddr {
        self.dns.server()
    }

    async fn probe_name(&self, name: &str) -> Result<ProbeOutcome, ProbeError> {
        let (addrs, cname) = tokio::join!(
            resolve_addrs(name),
            self.dns.query(name, RecordType::Cname)
        );

        let (exists, cname) = match cname {
            Ok(reply) => (name_exists(&reply), cname_target(&reply)),
            Err(DnsError::Timeout { .. }) => {
                debug!(name, "Nameserver did not answer; treating as absent");
                (false, None)
            }
            Err(e) => return Err(ProbeError::failed(name, e.to_string())),
        };

        let mut outcome = ProbeOutcome {
            addrs,
            exists,
            cname,
            ..ProbeOutcome::default()
        };
        if !outcome.is_live() {
            return Ok(outcome);
        }

        let txt = async {
            if self.txt {
                self.lookup_txt(name).await
            } else {
                Vec::new()
            }
        };
        let http = async {
            match &self.http {
                Some(fetcher) if outcome.resolved() => Some(fetcher.fetch(name).await),
                _ => None,
            }
        };
        let (txt, http): (Vec<String>, Option<HttpOutcome>) = tokio::join!(txt, http);
        outcome.txt = txt;
        outcome.http = http;
        Ok(outcome)
    }

    async fn lookup_txt(&self, name: &str) -> Vec<String> {
        match self.dns.query(name, RecordType::Txt).await {
            Ok(reply) => reply
                .answers
                .into_iter()
                .filter_map(|record| match record.data {
                    RecordData::Txt(strings) => Some(strings.concat()),
                    _ => None,
                })
                .collect(),
            Err(e) => {
                debug!(name, "TXT lookup failed: {e}");
                Vec::new()
            }
        }
    }
}

impl Probe for NetworkProbe {
    fn probe<'a>(&'a self, name: &'a str) -> ProbeFut<'a> {
        Box::pin(self.probe_name(name))
    }
}

/// Addresses from the system resolver; lookup failure means none.
async fn resolve_addrs(name: &str) -> Vec<IpAddr> {
    match lookup_host((name, 0)).await {
        Ok(addrs) => {
            let mut seen = HashSet::new();
            addrs
                .map(|addr| addr.ip())
                .filter(|ip| seen.insert(*ip))
                .collect()
        }
        Err(e) => {
            trace!(name, "Address lookup failed: {e}");
            Vec::new()
        }
    }
}

/// NOERROR means the name exists, even with no records of the asked type.
fn name_exists(reply: &Message) -> bool {
    reply.rcode == Rcode::NoError
}

fn cname_target(reply: &Message) -> Option<String> {
    reply.answers.iter().find_map(|record| match &record.data {
        RecordData::Cname(target) => Some(target.clone()),
        _ => None,
    })
}
