//! Weighted regex-segment matching
//!
//! A handler declares an ordered list of `(pattern, weight)` pairs. Each
//! pattern extracts segments from a user agent; when it matches nothing a
//! single empty segment stands in so positions stay aligned between the
//! query and every candidate. The difference of a candidate is
//!
//! ```text
//! Σ over patterns i, over aligned positions j:
//!     edit_distance(query[i][j], candidate[i][j]) × weight(i)
//! ```
//!
//! where a missing position compares against the empty string and
//! `weight(i)` defaults to `pattern_count - i`.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use regex::Regex;

use super::edit_distance::edit_distance;
use super::{keep_minimum, Candidate, MatchResult};
use crate::device::DeviceIndex;
use crate::error::FormatError;

/// A substring extracted by one pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub value: String,
    pub weight: u32,
}

/// One segment pattern with an optional explicit weight
#[derive(Debug, Clone)]
pub struct SegmentPattern {
    regex: Regex,
    weight: Option<u32>,
}

impl SegmentPattern {
    pub fn new(pattern: &str, weight: Option<u32>) -> Result<Self, FormatError> {
        let regex = Regex::new(pattern).map_err(|source| FormatError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex,
            weight: weight.filter(|w| *w > 0),
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Explicit weight, `None` when the default applies
    pub fn explicit_weight(&self) -> Option<u32> {
        self.weight
    }
}

/// (device, pattern index, byte length of the segmented text)
type SegmentKey = (DeviceIndex, usize, usize);

/// Compute-once store of candidate segments.
///
/// The text length is part of the key so a candidate cut to a maximum length
/// never shares an entry with its full user agent.
///
/// Entries are computed under their shard's write lock after a re-check, so
/// concurrent first access computes each entry at most once.
#[derive(Debug)]
pub struct SegmentCache {
    shards: Vec<RwLock<AHashMap<SegmentKey, Arc<[Segment]>>>>,
}

impl SegmentCache {
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| RwLock::new(AHashMap::new())).collect(),
        }
    }

    fn shard(&self, key: SegmentKey) -> &RwLock<AHashMap<SegmentKey, Arc<[Segment]>>> {
        let slot = key.0.wrapping_mul(31).wrapping_add(key.1) % self.shards.len();
        &self.shards[slot]
    }

    pub fn get_or_compute(
        &self,
        key: SegmentKey,
        compute: impl FnOnce() -> Arc<[Segment]>,
    ) -> Arc<[Segment]> {
        let shard = self.shard(key);
        if let Some(segments) = shard.read().get(&key) {
            return segments.clone();
        }

        let mut guard = shard.write();
        if let Some(segments) = guard.get(&key) {
            return segments.clone();
        }
        let segments = compute();
        guard.insert(key, segments.clone());
        segments
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Regex-segment matcher owned by one handler
#[derive(Debug)]
pub struct SegmentMatcher {
    patterns: Vec<SegmentPattern>,
    first_match_only: bool,
    cache: Option<SegmentCache>,
}

impl SegmentMatcher {
    pub fn new(patterns: Vec<SegmentPattern>, first_match_only: bool) -> Self {
        Self {
            patterns,
            first_match_only,
            cache: None,
        }
    }

    /// Memoize candidate segments across lookups
    pub fn with_cache(mut self, shards: usize) -> Self {
        self.cache = Some(SegmentCache::new(shards));
        self
    }

    /// Enable or drop memoization; an existing cache is kept when enabled.
    pub fn configure_cache(&mut self, enabled: bool, shards: usize) {
        if !enabled {
            self.cache = None;
        } else if self.cache.is_none() {
            self.cache = Some(SegmentCache::new(shards));
        }
    }

    pub fn patterns(&self) -> &[SegmentPattern] {
        &self.patterns
    }

    pub fn first_match_only(&self) -> bool {
        self.first_match_only
    }

    pub fn cache(&self) -> Option<&SegmentCache> {
        self.cache.as_ref()
    }

    /// Effective weight of a pattern position
    pub fn weight(&self, index: usize) -> u32 {
        self.patterns
            .get(index)
            .and_then(|p| p.weight)
            .unwrap_or_else(|| (self.patterns.len() - index) as u32)
    }

    fn extract(&self, index: usize, source: &str) -> Arc<[Segment]> {
        let weight = self.weight(index);
        let regex = &self.patterns[index].regex;
        let found: Vec<regex::Match<'_>> = if self.first_match_only {
            regex.find(source).into_iter().collect()
        } else {
            regex.find_iter(source).collect()
        };
        let mut segments: Vec<Segment> = found
            .into_iter()
            .map(|m| Segment {
                value: m.as_str().to_string(),
                weight,
            })
            .collect();

        if segments.is_empty() {
            segments.push(Segment {
                value: String::new(),
                weight,
            });
        }
        segments.into()
    }

    /// Segments of a query string, one group per pattern.
    pub fn create_all_segments(&self, source: &str) -> Vec<Arc<[Segment]>> {
        (0..self.patterns.len())
            .map(|index| self.extract(index, source))
            .collect()
    }

    /// Segments of a stored candidate for one pattern, memoized when the
    /// cache is enabled.
    pub fn create_segments(&self, device: DeviceIndex, index: usize, source: &str) -> Arc<[Segment]> {
        match &self.cache {
            Some(cache) => cache.get_or_compute((device, index, source.len()), || self.extract(index, source)),
            None => self.extract(index, source),
        }
    }

    /// Weighted distance between query segments and a candidate.
    pub fn difference(&self, query: &[Arc<[Segment]>], candidate: Candidate<'_>) -> u32 {
        let mut total: u32 = 0;
        for (index, query_segments) in query.iter().enumerate() {
            let candidate_segments = self.create_segments(candidate.device, index, candidate.user_agent);
            let weight = self.weight(index);
            let positions = query_segments.len().max(candidate_segments.len());
            for position in 0..positions {
                let q = query_segments.get(position).map_or("", |s| s.value.as_str());
                let c = candidate_segments.get(position).map_or("", |s| s.value.as_str());
                total = total.saturating_add(edit_distance(q, c).saturating_mul(weight));
            }
        }
        total
    }

    pub fn matches<'a>(
        &self,
        query: &str,
        candidates: impl IntoIterator<Item = Candidate<'a>>,
        handler: usize,
    ) -> Vec<MatchResult> {
        if self.patterns.is_empty() {
            return Vec::new();
        }
        let query_segments = self.create_all_segments(query);
        keep_minimum(
            candidates
                .into_iter()
                .map(|c| (c.device, self.difference(&query_segments, c))),
            handler,
        )
    }
}
