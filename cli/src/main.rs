//! delve CLI - binary entry point.
//!
//! # Architecture
//!
//! The binary wires [`delve_probe`] (network and disk) into [`delve_engine`]
//! (the explorer) and owns everything process-wide: argument parsing, config
//! loading, logging and Ctrl-C.
//!
//! ```text
//! main() -> Cli::parse() -> init_tracing() -> explore()
//!                                               |
//!            config + flags -> ExploreSettings, ProbeSettings
//!                                               |
//!            NetworkProbe + ConsoleSink(DirectorySink) -> Explorer::run
//!                                               |
//!                              RunReport -> summary line, exit code
//! ```
//!
//! Exit codes: 0 when the run completes, 130 when interrupted, 1 on setup
//! failure.

mod args;
mod console;

use std::env;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use delve_config::DelveConfig;
use delve_engine::{CancellationToken, Explorer, RunReport, permutation_count};
use delve_probe::{DirectorySink, NetworkProbe, ProbeSettings};
use delve_types::{Domain, ExploreSettings, Wordlist};

use args::Cli;
use console::ConsoleSink;

const EXIT_INTERRUPTED: u8 = 130;

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(env_filter)
            .init();
        return Ok(());
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log dir {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(env_filter)
        .init();
    info!(path = %path.display(), "Logging initialized");
    Ok(())
}

/// Explicit `--config` must exist; the default location is optional.
fn load_config(explicit: Option<&Path>) -> Result<Option<DelveConfig>> {
    match explicit {
        Some(path) => DelveConfig::load_from(path).map(Some).map_err(Into::into),
        None => DelveConfig::load().map_err(Into::into),
    }
}

fn default_output_dir(domain: &Domain) -> PathBuf {
    env::temp_dir().join(domain.as_str())
}

fn read_wordlist(path: &Path) -> Result<Wordlist> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read wordlist {}", path.display()))?;
    Wordlist::parse(&text).with_context(|| format!("unusable wordlist {}", path.display()))
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted; finishing in-flight probes");
                token.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
        }
    });
}

async fn explore(cli: Cli) -> Result<RunReport> {
    let config = load_config(cli.config.as_deref())?;

    let domain = Domain::new(&cli.domain).context("invalid --domain")?;
    let wordlist = read_wordlist(&cli.wordlist)?;

    let mut settings = match &config {
        Some(config) => config.explore_settings()?,
        None => ExploreSettings::default(),
    };
    cli.apply_engine(&mut settings);

    let mut probe_settings =
        ProbeSettings::from_config(config.as_ref().and_then(|c| c.probe.as_ref()))?;
    cli.apply_probe(&mut probe_settings)?;

    let output = cli
        .output
        .clone()
        .or_else(|| config.as_ref().and_then(DelveConfig::output_directory))
        .unwrap_or_else(|| default_output_dir(&domain));

    let probe = NetworkProbe::new(&probe_settings)?;
    info!(nameserver = %probe.nameserver(), output = %output.display(), "Probe configured");
    let sink = ConsoleSink::new(DirectorySink::new(&output), io::stdout());

    println!("Concurrency: {}", settings.concurrency);
    println!(
        "Permutations: {}",
        permutation_count(&wordlist, &settings.delimiters)
    );

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let explorer = Explorer::new(Arc::new(probe), Arc::new(sink), settings);
    let report = explorer.run(wordlist, domain, cancel).await?;

    println!("{report}");
    println!("Results saved in {}", output.display());
    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_file.as_deref()) {
        eprintln!("delve: {e:#}");
        return ExitCode::FAILURE;
    }

    match explore(cli).await {
        Ok(report) if report.cancelled => ExitCode::from(EXIT_INTERRUPTED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("delve: {e:#}");
            ExitCode::FAILURE
        }
    }
}
