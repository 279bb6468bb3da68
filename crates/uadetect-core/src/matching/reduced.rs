//! Reduced-initial-string matching
//!
//! A tolerance pattern is matched against the query; the end of its first
//! match fixes a prefix length `L`. Only the first `L` characters of the
//! query and of every candidate are compared, so long variable tails (build
//! numbers, locale tokens, plug-in lists) cannot dominate the score.

use regex::Regex;

use super::edit_distance::edit_distance;
use super::{keep_minimum, Candidate, MatchResult};
use crate::error::FormatError;

#[derive(Debug, Clone)]
pub struct ReducedInitialMatcher {
    tolerance: Regex,
}

impl ReducedInitialMatcher {
    pub fn new(tolerance: &str) -> Result<Self, FormatError> {
        let tolerance = Regex::new(tolerance).map_err(|source| FormatError::InvalidPattern {
            pattern: tolerance.to_string(),
            source,
        })?;
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> &str {
        self.tolerance.as_str()
    }

    /// Number of leading characters to compare, if the tolerance pattern
    /// matches a non-empty prefix of the query.
    pub fn reduced_length(&self, query: &str) -> Option<usize> {
        let end = self.tolerance.find(query)?.end();
        let length = query[..end].chars().count();
        (length > 0).then_some(length)
    }

    /// Candidates at minimum distance over the reduced prefix. Empty when the
    /// tolerance pattern does not apply to the query.
    pub fn matches<'a>(
        &self,
        query: &str,
        candidates: impl IntoIterator<Item = Candidate<'a>>,
        handler: usize,
    ) -> Vec<MatchResult> {
        let Some(length) = self.reduced_length(query) else {
            return Vec::new();
        };
        let reduced_query = prefix(query, length);
        keep_minimum(
            candidates.into_iter().map(|c| {
                let reduced = prefix(c.user_agent, length);
                (c.device, edit_distance(reduced_query, reduced))
            }),
            handler,
        )
    }
}

/// First `chars` characters of a string
fn prefix(value: &str, chars: usize) -> &str {
    match value.char_indices().nth(chars) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}
