//! Findings printed to the terminal as they happen.

use std::io::Write;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};

use delve_engine::{ProbeResult, Sink, SinkFut};
use delve_types::{HttpOutcome, ProbeOutcome};
use delve_utils::sanitize_display_text;

/// Prints one line per live name, then hands the result to `inner`.
pub struct ConsoleSink<S, W> {
    inner: S,
    out: Mutex<W>,
}

impl<S, W> ConsoleSink<S, W> {
    pub fn new(inner: S, out: W) -> Self {
        Self {
            inner,
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Sink, W: Write + Send> Sink for ConsoleSink<S, W> {
    fn record<'a>(&'a self, name: &'a str, result: &'a ProbeResult) -> SinkFut<'a> {
        Box::pin(async move {
            if let Ok(outcome) = result
                && let Some(line) = finding_line(name, outcome)
            {
                let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
                // A closed stdout must not stop the run.
                let _ = writeln!(out, "{line}");
            }
            self.inner.record(name, result).await
        })
    }
}

/// `Found:`, `DNS ONLY:` or `Exists:` line for a live name; `None` otherwise.
///
/// Everything that came off the network is stripped of control sequences.
pub fn finding_line(name: &str, outcome: &ProbeOutcome) -> Option<String> {
    if !outcome.is_live() {
        return None;
    }
    let name = sanitize_display_text(name);
    let cname = outcome
        .cname
        .as_deref()
        .map(|target| format!(" cname={}", sanitize_display_text(target)))
        .unwrap_or_default();

    let line = match &outcome.http {
        Some(HttpOutcome::Response {
            status, truncated, ..
        }) => {
            let cut = if *truncated { " (body truncated)" } else { "" };
            format!(
                "Found: {status} {} {name}{cname}{cut}",
                format_addrs(&outcome.addrs)
            )
        }
        Some(HttpOutcome::Failed { error }) => {
            format!("DNS ONLY: {name} {}", sanitize_display_text(error))
        }
        None if outcome.resolved() => {
            format!("Exists: {name} {}{cname}", format_addrs(&outcome.addrs))
        }
        None => format!("Exists: {name}{cname}"),
    };
    Some(line)
}

fn format_addrs(addrs: &[IpAddr]) -> String {
    let joined: Vec<String> = addrs.iter().map(ToString::to_string).collect();
    format!("[{}]", joined.join(" "))
}
