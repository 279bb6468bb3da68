//! Levenshtein edit-distance matching

use strsim::levenshtein;

use super::{keep_minimum, Candidate, MatchResult};

/// Character-level Levenshtein distance
#[inline]
pub fn edit_distance(a: &str, b: &str) -> u32 {
    u32::try_from(levenshtein(a, b)).unwrap_or(u32::MAX)
}

/// Score every candidate against the query and keep those at minimum distance.
pub fn edit_distance_match<'a>(
    query: &str,
    candidates: impl IntoIterator<Item = Candidate<'a>>,
    handler: usize,
) -> Vec<MatchResult> {
    keep_minimum(
        candidates
            .into_iter()
            .map(|c| (c.device, edit_distance(query, c.user_agent))),
        handler,
    )
}
