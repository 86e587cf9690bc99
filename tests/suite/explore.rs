//! The explorer driving the real network probe against a loopback zone.

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use delve_engine::{CancellationToken, Explorer, RunReport};
use delve_probe::{DirectorySink, NetworkProbe, ProbeSettings};
use delve_types::{Delimiters, Domain, ExploreSettings, Wordlist};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::common::{Zone, ZoneServer};

fn probe_settings(nameserver: SocketAddr) -> ProbeSettings {
    ProbeSettings {
        nameserver: Some(nameserver),
        dns_timeout: Duration::from_millis(300),
        dns_attempts: 1,
        http: None,
        ..ProbeSettings::default()
    }
}

fn explore_settings() -> ExploreSettings {
    ExploreSettings {
        delimiters: Delimiters::new(vec![String::new()]).unwrap(),
        ..ExploreSettings::default().with_concurrency(4).unwrap()
    }
}

async fn explore(nameserver: SocketAddr, words: &[&str], out: &Path) -> RunReport {
    let probe = NetworkProbe::new(&probe_settings(nameserver)).unwrap();
    let sink = DirectorySink::new(out);
    let explorer = Explorer::new(Arc::new(probe), Arc::new(sink), explore_settings());
    let wordlist = Wordlist::from_words(words.iter().copied()).unwrap();
    let domain = Domain::new("delve.test").unwrap();

    timeout(
        Duration::from_secs(60),
        explorer.run(wordlist, domain, CancellationToken::new()),
    )
    .await
    .expect("exploration did not terminate")
    .unwrap()
}

#[tokio::test]
async fn live_names_expand_and_leave_txt_files() {
    let zone = Zone::new()
        .with("www.delve.test", &["v=spf1 -all"])
        .with("api.www.delve.test", &[]);
    let server = ZoneServer::start(zone).await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results");

    let report = explore(server.addr, &["www", "api"], &out).await;

    // www, api, wwwwww, wwwapi, apiwww, apiapi
    assert_eq!(report.seeded, 6);
    // Two children for each of the two live names.
    assert_eq!(report.expanded, 4);
    assert_eq!(report.dispatched, 10);
    assert_eq!(report.live, 2);
    assert_eq!(report.probe_errors, 0);
    assert!(!report.cancelled);
    assert_eq!(report.pending, 0);

    assert!(server.asked("api.www.delve.test"));
    assert!(server.asked("www.api.www.delve.test"));
    assert!(!server.asked("www.api.delve.test"), "dead names never expand");

    assert_eq!(
        fs::read_to_string(out.join("www.delve.test-txt")).unwrap(),
        "v=spf1 -all"
    );
    assert!(!out.join("api.www.delve.test-txt").exists());
}

#[tokio::test]
async fn silent_nameserver_means_nothing_exists() {
    let silent = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results");

    let report = explore(silent.local_addr().unwrap(), &["www", "api"], &out).await;

    assert_eq!(report.dispatched, 6);
    assert_eq!(report.live, 0);
    assert_eq!(report.expanded, 0);
    assert_eq!(report.probe_errors, 0);
    assert!(!out.exists());
}
