//! Core domain types for delve.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod outcome;
pub use outcome::{HttpOutcome, ProbeOutcome};

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

/// Default admission capacity (simultaneous probes).
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Delimiters joining two words into one label, in generation order.
pub const DEFAULT_DELIMITERS: &[&str] = &["", "0", "1", "2", "3", "-", "_"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("domain must not be empty")]
    EmptyDomain,
    #[error("invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: &'static str },
    #[error("wordlist contains no words")]
    EmptyWordlist,
    #[error("delimiter set must not be empty")]
    EmptyDelimiters,
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}

// ============================================================================
// Candidate
// ============================================================================

/// One unit of work: a subdomain label relative to the root [`Domain`].
///
/// Cloning is a reference-count bump; queues and tasks pass these around freely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate(Arc<str>);

impl Candidate {
    #[must_use]
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self(label.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the deeper candidate `word.label`.
    #[must_use]
    pub fn child(&self, word: &str) -> Self {
        Self(format!("{word}.{}", self.0).into())
    }

    /// Full name to probe: `label.domain`.
    #[must_use]
    pub fn qualify(&self, domain: &Domain) -> String {
        format!("{}.{}", self.0, domain.as_str())
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Candidate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Candidate {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Domain
// ============================================================================

/// Root domain every candidate label is appended to.
///
/// Normalized on construction: trimmed, lowercased, without leading or
/// trailing dots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Domain(String);

impl Domain {
    pub fn new(raw: &str) -> Result<Self, TypeError> {
        let normalized = raw.trim().trim_matches('.').to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(TypeError::EmptyDomain);
        }
        if normalized.split('.').any(str::is_empty) {
            return Err(TypeError::InvalidDomain {
                domain: normalized,
                reason: "empty label",
            });
        }
        if normalized
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | ':'))
        {
            return Err(TypeError::InvalidDomain {
                domain: normalized,
                reason: "contains whitespace, control or path characters",
            });
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Domain {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Wordlist
// ============================================================================

/// Immutable seed words, shared by every task that expands the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wordlist(Arc<[String]>);

impl Wordlist {
    /// Parse newline-delimited words.
    ///
    /// Lines are trimmed; blank lines and `#` comments are skipped. Order is
    /// preserved and duplicates are kept.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let words: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self::from_words(words)
    }

    pub fn from_words<I, S>(words: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.is_empty() {
            return Err(TypeError::EmptyWordlist);
        }
        Ok(Self(words.into()))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Delimiters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct Delimiters(Vec<String>);

impl Delimiters {
    pub fn new(delimiters: Vec<String>) -> Result<Self, TypeError> {
        if delimiters.is_empty() {
            return Err(TypeError::EmptyDelimiters);
        }
        Ok(Self(delimiters))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self(DEFAULT_DELIMITERS.iter().map(ToString::to_string).collect())
    }
}

impl TryFrom<Vec<String>> for Delimiters {
    type Error = TypeError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Explicit knobs threaded into the explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreSettings {
    /// Admission capacity: maximum probes in flight.
    pub concurrency: NonZeroUsize,
    pub delimiters: Delimiters,
    /// Drop candidates that were already queued once.
    pub dedupe: bool,
}

impl ExploreSettings {
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, TypeError> {
        self.concurrency = NonZeroUsize::new(concurrency).ok_or(TypeError::ZeroConcurrency)?;
        Ok(self)
    }
}

impl Default for ExploreSettings {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
            delimiters: Delimiters::default(),
            dedupe: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_child_prepends_word() {
        let parent = Candidate::new("api");
        assert_eq!(parent.child("dev").as_str(), "dev.api");
        assert_eq!(parent.child("dev").child("v2").as_str(), "v2.dev.api");
    }

    #[test]
    fn candidate_qualify_appends_domain() {
        let domain = Domain::new("example.com").unwrap();
        assert_eq!(Candidate::new("www").qualify(&domain), "www.example.com");
    }

    #[test]
    fn domain_normalizes_case_and_dots() {
        let domain = Domain::new("  .Example.COM. ").unwrap();
        assert_eq!(domain.as_str(), "example.com");
    }

    #[test]
    fn domain_rejects_empty_and_malformed() {
        assert_eq!(Domain::new(" . "), Err(TypeError::EmptyDomain));
        assert!(matches!(
            Domain::new("a..b"),
            Err(TypeError::InvalidDomain { .. })
        ));
        assert!(matches!(
            Domain::new("evil/../com"),
            Err(TypeError::InvalidDomain { .. })
        ));
        assert!(matches!(
            Domain::new("has space.com"),
            Err(TypeError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn wordlist_skips_blank_lines_and_comments() {
        let list = Wordlist::parse("www\n\n  api  \n# comment\nmail\n").unwrap();
        assert_eq!(list.as_slice(), ["www", "api", "mail"]);
    }

    #[test]
    fn wordlist_keeps_duplicates_in_order() {
        let list = Wordlist::parse("b\na\nb").unwrap();
        assert_eq!(list.as_slice(), ["b", "a", "b"]);
    }

    #[test]
    fn wordlist_rejects_empty_input() {
        assert_eq!(Wordlist::parse("\n\n# nothing\n"), Err(TypeError::EmptyWordlist));
    }

    #[test]
    fn default_delimiters_start_with_empty() {
        let delims = Delimiters::default();
        let collected: Vec<&str> = delims.iter().collect();
        assert_eq!(collected, DEFAULT_DELIMITERS);
    }

    #[test]
    fn delimiters_reject_empty_set() {
        assert_eq!(Delimiters::new(Vec::new()), Err(TypeError::EmptyDelimiters));
    }

    #[test]
    fn delimiters_deserialize_through_validation() {
        #[derive(Deserialize)]
        struct Wrapper {
            delimiters: Delimiters,
        }

        let ok: Wrapper = toml::from_str(r#"delimiters = ["", "-"]"#).unwrap();
        assert_eq!(ok.delimiters.len(), 2);

        let err = toml::from_str::<Wrapper>("delimiters = []");
        assert!(err.is_err());
    }

    #[test]
    fn settings_reject_zero_concurrency() {
        let result = ExploreSettings::default().with_concurrency(0);
        assert_eq!(result, Err(TypeError::ZeroConcurrency));
        let settings = ExploreSettings::default().with_concurrency(4).unwrap();
        assert_eq!(settings.concurrency.get(), 4);
    }
}
