//! Matching algorithms
//!
//! Every algorithm scores a query against the candidates registered to one
//! handler and returns the candidates at the minimum **difference** (lower is
//! closer). Ties produce several equally ranked results; the provider breaks
//! them afterwards.
//!
//! # Algorithms
//!
//! 1. Edit distance: Levenshtein distance over the whole user agent
//! 2. Regex segments: weighted sum of per-segment edit distances
//! 3. Reduced initial string: edit distance over a tolerance-bounded prefix
//!
//! Exact-hash and UAProf lookups are not algorithms in this sense; they are
//! served directly by the handler indices.

mod edit_distance;
mod reduced;
mod segments;

use serde::Serialize;

use crate::device::DeviceIndex;

pub use edit_distance::{edit_distance, edit_distance_match};
pub use reduced::ReducedInitialMatcher;
pub use segments::{Segment, SegmentCache, SegmentMatcher, SegmentPattern};

/// A candidate device considered by a matcher
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub device: DeviceIndex,
    pub user_agent: &'a str,
}

/// One scored device produced by a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub device: DeviceIndex,
    pub difference: u32,
    /// Declaration index of the handler that produced the result; `None`
    /// for an exact hit on a device no handler registered
    pub handler: Option<usize>,
}

impl MatchResult {
    pub fn new(device: DeviceIndex, difference: u32, handler: usize) -> Self {
        Self {
            device,
            difference,
            handler: Some(handler),
        }
    }

    /// Exact hit outside every handler
    pub fn unowned(device: DeviceIndex) -> Self {
        Self {
            device,
            difference: 0,
            handler: None,
        }
    }
}

/// Ordered collection of match results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Results(Vec<MatchResult>);

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: MatchResult) {
        self.0.push(result);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchResult> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[MatchResult] {
        &self.0
    }

    /// Stable sort ascending by difference; equal differences keep
    /// insertion order, which is handler confidence order.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|r| r.difference);
    }

    pub fn min_difference(&self) -> Option<u32> {
        self.0.iter().map(|r| r.difference).min()
    }

    pub fn into_vec(self) -> Vec<MatchResult> {
        self.0
    }
}

impl From<Vec<MatchResult>> for Results {
    fn from(results: Vec<MatchResult>) -> Self {
        Self(results)
    }
}

impl Extend<MatchResult> for Results {
    fn extend<I: IntoIterator<Item = MatchResult>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<MatchResult> for Results {
    fn from_iter<I: IntoIterator<Item = MatchResult>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a MatchResult;
    type IntoIter = std::slice::Iter<'a, MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'a> Candidate<'a> {
    /// The same candidate with its user agent cut to `max` characters
    pub fn truncated(self, max: usize) -> Self {
        Self {
            user_agent: truncate_chars(self.user_agent, max),
            ..self
        }
    }
}

/// First `max` characters of `value`
pub fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((end, _)) => &value[..end],
        None => value,
    }
}

/// Keep only the results at the minimum difference, in candidate order.
pub(crate) fn keep_minimum(
    scored: impl IntoIterator<Item = (DeviceIndex, u32)>,
    handler: usize,
) -> Vec<MatchResult> {
    let mut best: Vec<MatchResult> = Vec::new();
    let mut min = u32::MAX;
    for (device, difference) in scored {
        if difference < min {
            min = difference;
            best.clear();
        }
        if difference == min && !best.iter().any(|r| r.device == device) {
            best.push(MatchResult::new(device, difference, handler));
        }
    }
    best
}
