use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use delve_probe::{ProbeSettings, SetupError, parse_nameserver_arg};
use delve_types::ExploreSettings;

#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Recursively discover subdomains by permuting a wordlist")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// Newline-delimited words to permute
    #[arg(long, short = 'w')]
    pub wordlist: PathBuf,

    /// Base domain to explore (e.g. example.com)
    #[arg(long, short = 'd')]
    pub domain: String,

    /// Maximum probes in flight [default: 100]
    #[arg(long, short = 'c')]
    pub concurrency: Option<NonZeroUsize>,

    /// Directory for result files [default: <tmp>/<domain>]
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Config file [default: ~/.delve/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip candidates that were already queued once
    #[arg(long)]
    pub dedupe: bool,

    /// Do not fetch http://<name>/ for resolved names
    #[arg(long)]
    pub no_http: bool,

    /// Do not query TXT records
    #[arg(long)]
    pub no_txt: bool,

    /// Nameserver for existence checks (ip or ip:port) [default: from /etc/resolv.conf]
    #[arg(long)]
    pub nameserver: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Flags win over config values.
    pub fn apply_engine(&self, settings: &mut ExploreSettings) {
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if self.dedupe {
            settings.dedupe = true;
        }
    }

    pub fn apply_probe(&self, settings: &mut ProbeSettings) -> Result<(), SetupError> {
        if let Some(raw) = self.nameserver.as_deref() {
            settings.nameserver = Some(parse_nameserver_arg(raw)?);
        }
        if self.no_http {
            settings.http = None;
        }
        if self.no_txt {
            settings.txt = false;
        }
        Ok(())
    }
}
