//! The `delve` binary end to end.

use std::fs;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::common::{Zone, ZoneServer, write_config, write_wordlist};

const CONFIG: &str = r#"
[engine]
concurrency = 4
delimiters = [""]

[probe]
dns_timeout_ms = 300
"#;

async fn run_delve(dir: &Path, args: &[&str]) -> Output {
    let config = write_config(dir, CONFIG);
    let mut command = Command::new(env!("CARGO_BIN_EXE_delve"));
    command
        .arg("--config")
        .arg(&config)
        .args(args)
        .env("RUST_LOG", "warn")
        .kill_on_drop(true);
    timeout(Duration::from_secs(60), command.output())
        .await
        .expect("delve did not exit")
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[tokio::test]
async fn prints_findings_and_writes_results() {
    let server = ZoneServer::start(Zone::new().with("mail.delve.test", &["hello"])).await;
    let dir = tempfile::tempdir().unwrap();
    let wordlist = write_wordlist(dir.path(), &["mail", "# comment", "", "dev"]);
    let out = dir.path().join("out");
    let nameserver = server.addr.to_string();

    let output = run_delve(
        dir.path(),
        &[
            "--wordlist",
            wordlist.to_str().unwrap(),
            "--domain",
            "Delve.Test.",
            "--nameserver",
            &nameserver,
            "--no-http",
            "--output",
            out.to_str().unwrap(),
        ],
    )
    .await;

    let printed = stdout(&output);
    assert!(output.status.success(), "stdout: {printed}");
    assert!(printed.contains("Concurrency: 4"), "stdout: {printed}");
    assert!(printed.contains("Permutations: 6"), "stdout: {printed}");
    assert!(printed.contains("Exists: mail.delve.test"), "stdout: {printed}");
    assert!(!printed.contains("Exists: dev.delve.test"), "stdout: {printed}");
    // 6 seeded plus mail.mail and dev.mail.
    assert!(printed.contains("8 probed"), "stdout: {printed}");
    assert!(printed.contains(&format!("Results saved in {}", out.display())));

    assert!(server.asked("dev.mail.delve.test"));
    assert_eq!(
        fs::read_to_string(out.join("mail.delve.test-txt")).unwrap(),
        "hello"
    );
}

#[tokio::test]
async fn no_txt_flag_skips_txt_lookups() {
    let server = ZoneServer::start(Zone::new().with("mail.delve.test", &["hello"])).await;
    let dir = tempfile::tempdir().unwrap();
    let wordlist = write_wordlist(dir.path(), &["mail"]);
    let out = dir.path().join("out");
    let nameserver = server.addr.to_string();

    let output = run_delve(
        dir.path(),
        &[
            "-w",
            wordlist.to_str().unwrap(),
            "-d",
            "delve.test",
            "--nameserver",
            &nameserver,
            "--no-http",
            "--no-txt",
            "-o",
            out.to_str().unwrap(),
        ],
    )
    .await;

    assert!(output.status.success());
    assert!(stdout(&output).contains("Exists: mail.delve.test"));
    assert!(server.queries().iter().all(|(_, qtype)| *qtype != 16));
    assert!(!out.join("mail.delve.test-txt").exists());
}

#[tokio::test]
async fn missing_wordlist_fails_with_status_one() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.txt");

    let output = run_delve(
        dir.path(),
        &[
            "--wordlist",
            missing.to_str().unwrap(),
            "--domain",
            "delve.test",
            "--nameserver",
            "127.0.0.1:9",
        ],
    )
    .await;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read wordlist"), "stderr: {stderr}");
}

#[tokio::test]
async fn invalid_domain_and_nameserver_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let wordlist = write_wordlist(dir.path(), &["www"]);
    let wordlist = wordlist.to_str().unwrap();

    let bad_domain = run_delve(
        dir.path(),
        &["-w", wordlist, "-d", "bad domain", "--nameserver", "127.0.0.1"],
    )
    .await;
    assert_eq!(bad_domain.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad_domain.stderr).contains("invalid --domain"));

    let bad_nameserver = run_delve(
        dir.path(),
        &["-w", wordlist, "-d", "delve.test", "--nameserver", "nowhere"],
    )
    .await;
    assert_eq!(bad_nameserver.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&bad_nameserver.stderr).contains("invalid nameserver"));
}

#[tokio::test]
async fn zero_concurrency_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let wordlist = write_wordlist(dir.path(), &["www"]);

    let output = run_delve(
        dir.path(),
        &["-w", wordlist.to_str().unwrap(), "-d", "delve.test", "-c", "0"],
    )
    .await;

    // clap reports usage errors with status 2.
    assert_eq!(output.status.code(), Some(2));
}
