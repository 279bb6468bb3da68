//! Handler framework
//!
//! A handler is a named, confidence-ranked matching strategy that owns a
//! subset of the dataset. Allow/deny pattern trees decide which requests it
//! applies to; its hash indices hold the devices registered to it; its
//! [`Algorithm`] produces fuzzy matches when no exact key hits.
//!
//! # Matching a request
//!
//! 1. Exact hash lookup of the user agent (difference 0)
//! 2. UAProf lookup of the profile headers, if the handler checks them
//! 3. The handler's fuzzy algorithm over its own registrations
//!
//! Handler indices are filled during load through a builder that serializes
//! registration behind a lock, and are read without locking once frozen into
//! a [`Handler`].

mod index;
pub mod uaprof;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::{DeviceGraph, DeviceIndex};
use crate::error::FormatError;
use crate::headers::RequestHeaders;
use crate::matching::{
    edit_distance_match, truncate_chars, Candidate, MatchResult, ReducedInitialMatcher, Results,
    SegmentMatcher,
};
use crate::pattern::{any_match, PatternNode};

pub use index::{HandlerIndex, HashIndex, IndexEntry};

/// Algorithm family, as tagged in the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    EditDistance,
    RegexSegment,
    ReducedInitialString,
}

impl HandlerKind {
    pub fn tag(self) -> u8 {
        match self {
            HandlerKind::EditDistance => 1,
            HandlerKind::RegexSegment => 2,
            HandlerKind::ReducedInitialString => 3,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, FormatError> {
        match tag {
            1 => Ok(HandlerKind::EditDistance),
            2 => Ok(HandlerKind::RegexSegment),
            3 => Ok(HandlerKind::ReducedInitialString),
            other => Err(FormatError::UnknownHandlerType(other)),
        }
    }
}

/// Fuzzy algorithm with its parameters
#[derive(Debug)]
pub enum Algorithm {
    EditDistance,
    RegexSegment(SegmentMatcher),
    /// Tries the reduced prefix first and falls back to full edit distance
    /// when that produces nothing.
    ReducedInitialString(ReducedInitialMatcher),
}

impl Algorithm {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Algorithm::EditDistance => HandlerKind::EditDistance,
            Algorithm::RegexSegment(_) => HandlerKind::RegexSegment,
            Algorithm::ReducedInitialString(_) => HandlerKind::ReducedInitialString,
        }
    }

    fn matches<'a>(
        &self,
        query: &str,
        candidates: impl Iterator<Item = Candidate<'a>> + Clone,
        handler: usize,
    ) -> Vec<MatchResult> {
        match self {
            Algorithm::EditDistance => edit_distance_match(query, candidates, handler),
            Algorithm::RegexSegment(matcher) => matcher.matches(query, candidates, handler),
            Algorithm::ReducedInitialString(matcher) => {
                let results = matcher.matches(query, candidates.clone(), handler);
                if results.is_empty() {
                    edit_distance_match(query, candidates, handler)
                } else {
                    results
                }
            }
        }
    }
}

/// Declarative description of a handler, before it is bound to a graph
#[derive(Debug)]
pub struct HandlerDef {
    pub name: String,
    pub confidence: u8,
    pub check_uaprofs: bool,
    pub algorithm: Algorithm,
    pub allow: Vec<PatternNode>,
    pub deny: Vec<PatternNode>,
    /// Device ids the fallback chain of a claimed device must pass through
    pub roots: Vec<String>,
    pub default_device: Option<String>,
}

impl HandlerDef {
    pub fn new(name: impl Into<String>, confidence: u8, algorithm: Algorithm) -> Self {
        Self {
            name: name.into(),
            confidence,
            check_uaprofs: false,
            algorithm,
            allow: Vec::new(),
            deny: Vec::new(),
            roots: Vec::new(),
            default_device: None,
        }
    }

    pub fn check_uaprofs(mut self, check: bool) -> Self {
        self.check_uaprofs = check;
        self
    }

    pub fn allow(mut self, node: PatternNode) -> Self {
        self.allow.push(node);
        self
    }

    pub fn deny(mut self, node: PatternNode) -> Self {
        self.deny.push(node);
        self
    }

    pub fn root(mut self, device_id: impl Into<String>) -> Self {
        self.roots.push(device_id.into());
        self
    }

    pub fn default_device(mut self, device_id: impl Into<String>) -> Self {
        self.default_device = Some(device_id.into());
        self
    }
}

/// A handler bound to a device graph
#[derive(Debug)]
pub struct Handler {
    position: usize,
    name: String,
    confidence: u8,
    check_uaprofs: bool,
    algorithm: Algorithm,
    allow: Vec<PatternNode>,
    deny: Vec<PatternNode>,
    roots: Vec<DeviceIndex>,
    default_device: Option<DeviceIndex>,
    index: HandlerIndex,
}

impl Handler {
    /// Declaration index among the provider's handlers
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn checks_uaprofs(&self) -> bool {
        self.check_uaprofs
    }

    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    pub(crate) fn algorithm_mut(&mut self) -> &mut Algorithm {
        &mut self.algorithm
    }

    pub fn kind(&self) -> HandlerKind {
        self.algorithm.kind()
    }

    pub fn allow_patterns(&self) -> &[PatternNode] {
        &self.allow
    }

    pub fn deny_patterns(&self) -> &[PatternNode] {
        &self.deny
    }

    pub fn roots(&self) -> &[DeviceIndex] {
        &self.roots
    }

    pub fn default_device(&self) -> Option<DeviceIndex> {
        self.default_device
    }

    pub(crate) fn set_default_device(&mut self, device: Option<DeviceIndex>) {
        self.default_device = device;
    }

    pub fn index(&self) -> &HandlerIndex {
        &self.index
    }

    /// Devices registered by user agent, in registration order
    pub fn devices(&self) -> impl Iterator<Item = DeviceIndex> + '_ {
        self.index.user_agents.entries().iter().map(|e| e.device)
    }

    /// Deny wins over allow; no allow match means no.
    pub fn can_handle(&self, user_agent: &str) -> bool {
        !any_match(&self.deny, user_agent) && any_match(&self.allow, user_agent)
    }

    /// Like [`Handler::can_handle`], additionally accepting requests whose
    /// UAProf header points at a host this handler has registered profiles
    /// for.
    pub fn can_handle_request(&self, user_agent: &str, headers: &RequestHeaders) -> bool {
        if any_match(&self.deny, user_agent) {
            return false;
        }
        if any_match(&self.allow, user_agent) {
            return true;
        }
        self.check_uaprofs
            && !self.index.uaprof_hosts.is_empty()
            && uaprof::profile_urls(headers)
                .iter()
                .filter_map(|url| uaprof::host(url))
                .any(|host| self.index.uaprof_hosts.contains(&host))
    }

    /// Whether a device belongs to this handler: its user agent must be
    /// accepted and, when roots are declared, its fallback chain must pass
    /// through one of them.
    pub fn can_handle_device(&self, graph: &DeviceGraph, device: DeviceIndex) -> bool {
        let Some(user_agent) = graph.user_agent(device) else {
            return false;
        };
        self.can_handle(user_agent)
            && (self.roots.is_empty()
                || self
                    .roots
                    .iter()
                    .any(|root| graph.is_ancestor(*root, device)))
    }

    /// Exact hash hit on the user agent
    pub fn match_exact(&self, user_agent: &str) -> Option<MatchResult> {
        self.index
            .user_agents
            .get(user_agent)
            .next()
            .map(|device| MatchResult::new(device, 0, self.position))
    }

    /// Every device registered under one of the request's UAProf URLs
    pub fn match_uaprof(&self, headers: &RequestHeaders) -> Vec<MatchResult> {
        if !self.check_uaprofs || headers.is_empty() {
            return Vec::new();
        }
        let mut results: Vec<MatchResult> = Vec::new();
        for url in uaprof::profile_urls(headers) {
            for device in self.index.uaprofs.get(&url) {
                if !results.iter().any(|r| r.device == device) {
                    results.push(MatchResult::new(device, 0, self.position));
                }
            }
        }
        results
    }

    /// The handler's fuzzy algorithm over its own registrations
    pub fn match_fuzzy(&self, user_agent: &str) -> Vec<MatchResult> {
        self.algorithm
            .matches(user_agent, self.index.user_agents.candidates(), self.position)
    }

    /// Fuzzy match with the query and every candidate cut to `max`
    /// characters, so both sides are compared at the same length.
    pub fn match_fuzzy_truncated(&self, user_agent: &str, max: usize) -> Vec<MatchResult> {
        let candidates = self
            .index
            .user_agents
            .candidates()
            .map(move |c| c.truncated(max));
        self.algorithm
            .matches(truncate_chars(user_agent, max), candidates, self.position)
    }

    /// Exact, then UAProf, then fuzzy. Never fails; no candidates means an
    /// empty result set.
    pub fn matches(&self, user_agent: &str, headers: &RequestHeaders) -> Results {
        if let Some(exact) = self.match_exact(user_agent) {
            return vec![exact].into();
        }
        let uaprof = self.match_uaprof(headers);
        if !uaprof.is_empty() {
            return uaprof.into();
        }
        self.match_fuzzy(user_agent).into()
    }
}

/// Load-time wrapper that registers devices behind a lock
#[derive(Debug)]
pub(crate) struct HandlerBuilder {
    handler: Handler,
    index: Mutex<HandlerIndex>,
}

impl HandlerBuilder {
    /// Bind a definition to a fully loaded graph. Root and default device ids
    /// that the graph does not contain are dropped with a warning.
    pub fn new(def: HandlerDef, position: usize, graph: &DeviceGraph) -> Self {
        let roots = def
            .roots
            .iter()
            .filter_map(|id| {
                let found = graph.find(id);
                if found.is_none() {
                    warn!(handler = %def.name, device = %id, "unknown root device");
                }
                found
            })
            .collect();
        let default_device = def.default_device.as_deref().and_then(|id| {
            let found = graph.find(id);
            if found.is_none() {
                warn!(handler = %def.name, device = %id, "unknown default device");
            }
            found
        });

        Self {
            handler: Handler {
                position,
                name: def.name,
                confidence: def.confidence,
                check_uaprofs: def.check_uaprofs,
                algorithm: def.algorithm,
                allow: def.allow,
                deny: def.deny,
                roots,
                default_device,
                index: HandlerIndex::default(),
            },
            index: Mutex::new(HandlerIndex::default()),
        }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Register a device under its user agent and, when UAProfs are checked,
    /// under each declared profile URL. Returns whether the user agent was
    /// newly registered.
    pub fn set(&self, graph: &DeviceGraph, device: DeviceIndex) -> bool {
        let Some(info) = graph.get(device) else {
            return false;
        };
        let user_agent: Option<Arc<str>> =
            info.user_agent().and_then(|ua| graph.strings().get_shared(ua));

        let mut index = self.index.lock();
        let added = match user_agent {
            Some(ua) => index.user_agents.insert_unique(ua, device),
            None => false,
        };

        if self.handler.check_uaprofs {
            for slot in uaprof::UAPROF_CAPABILITIES {
                let Some(value) = graph.capability(device, slot) else {
                    continue;
                };
                let Some(url) = uaprof::normalize_url(value) else {
                    continue;
                };
                if let Some(host) = uaprof::host(&url) {
                    index.uaprof_hosts.insert(host);
                }
                index.uaprofs.insert(Arc::from(url), device);
            }
        }
        added
    }

    pub fn freeze(self) -> Handler {
        let mut handler = self.handler;
        handler.index = self.index.into_inner();
        debug!(
            handler = %handler.name,
            confidence = handler.confidence,
            user_agents = handler.index.user_agents.len(),
            uaprofs = handler.index.uaprofs.len(),
            "handler registered"
        );
        handler
    }
}
