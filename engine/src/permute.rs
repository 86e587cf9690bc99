//! Initial candidate generation.

use std::iter;

use delve_types::{Candidate, Delimiters, Wordlist};

/// Number of candidates [`generate_permutations`] yields.
#[must_use]
pub fn permutation_count(wordlist: &Wordlist, delimiters: &Delimiters) -> usize {
    delimiters.len() * (wordlist.len() + 1) * wordlist.len()
}

/// Every `sub + delim + word` for each delimiter, each word, each sub-word.
///
/// The empty string is injected ahead of the wordlist as a pseudo-word, so with
/// the leading `""` delimiter every bare word is produced before any combined
/// label. Output order depends only on input order.
#[must_use]
pub fn generate_permutations(wordlist: &Wordlist, delimiters: &Delimiters) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(permutation_count(wordlist, delimiters));
    for delim in delimiters.iter() {
        for word in iter::once("").chain(wordlist.iter()) {
            for sub in wordlist.iter() {
                out.push(Candidate::new(format!("{sub}{delim}{word}")));
            }
        }
    }
    out
}
