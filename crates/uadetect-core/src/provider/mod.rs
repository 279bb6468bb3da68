//! Provider: the lookup orchestrator
//!
//! For an inbound user agent the provider runs a fixed sequence of phases
//! and stops at the first that produces a device:
//!
//! ```text
//! Start → ExactHash ─hit→ Done
//!            └miss→ UAProf ─hit→ Done
//!                     └miss→ Fuzzy (per handler, confidence order)
//!                              → Aggregate → TieBreak → Done(device | default)
//! ```
//!
//! Handlers are consulted in descending confidence, ties in declaration
//! order. Confidence decides iteration order and which handler wins a tie
//! on difference; it never re-weights the difference itself.
//!
//! Everything is immutable once built, so a `Provider` can be shared between
//! threads and queried concurrently without locking.

mod config;
pub mod resolve;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::dataset;
use crate::device::{DeviceGraph, DeviceIndex, DeviceRef};
use crate::error::LoadResult;
use crate::handler::{Algorithm, Handler, HashIndex};
use crate::headers::RequestHeaders;
use crate::matching::{MatchResult, Results};

pub use config::{ProviderConfig, Resolution};

/// Which phase produced the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    UaProf,
    Fuzzy,
    Default,
    None,
}

/// Outcome of one lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub device: Option<DeviceIndex>,
    pub difference: Option<u32>,
    /// Declaration index of the handler that produced the device
    pub handler: Option<usize>,
    pub method: MatchMethod,
}

impl Detection {
    fn matched(result: MatchResult, method: MatchMethod) -> Self {
        Self {
            device: Some(result.device),
            difference: Some(result.difference),
            handler: result.handler,
            method,
        }
    }

    fn fallback(device: Option<DeviceIndex>) -> Self {
        Self {
            device,
            difference: None,
            handler: None,
            method: if device.is_some() {
                MatchMethod::Default
            } else {
                MatchMethod::None
            },
        }
    }
}

/// Loaded dataset plus its handlers, ready for lookups
#[derive(Debug)]
pub struct Provider {
    copyright: String,
    graph: DeviceGraph,
    handlers: Vec<Handler>,
    order: Vec<usize>,
    exact: HashIndex,
    config: ProviderConfig,
}

impl Provider {
    /// Load a gzip-compressed binary dataset from a file.
    pub fn open(path: impl AsRef<Path>) -> LoadResult<Self> {
        Self::open_with_config(path, ProviderConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: ProviderConfig) -> LoadResult<Self> {
        let file = std::fs::File::open(path)?;
        dataset::load(file, config)
    }

    pub fn from_bytes(bytes: &[u8], config: ProviderConfig) -> LoadResult<Self> {
        dataset::load(bytes, config)
    }

    pub fn from_reader(reader: impl std::io::Read, config: ProviderConfig) -> LoadResult<Self> {
        dataset::load(reader, config)
    }

    /// Final assembly shared by the binary reader and the builder.
    pub(crate) fn assemble(
        copyright: String,
        graph: DeviceGraph,
        mut handlers: Vec<Handler>,
        config: ProviderConfig,
    ) -> Self {
        for handler in &mut handlers {
            if let Some(id) = config.handler_defaults.get(handler.name()) {
                match graph.find(id) {
                    Some(device) => handler.set_default_device(Some(device)),
                    None => {
                        warn!(handler = %handler.name(), device = %id, "unknown handler default device")
                    }
                }
            }
            if let Algorithm::RegexSegment(matcher) = handler.algorithm_mut() {
                matcher.configure_cache(config.cache_segments, config.segment_cache_shards);
            }
        }

        for id in &config.default_device_ids {
            if graph.find(id).is_none() {
                warn!(device = %id, "configured default device not in dataset");
            }
        }

        let mut exact = HashIndex::new();
        for (index, device) in graph.iter() {
            if let Some(ua) = device.user_agent().and_then(|ua| graph.strings().get_shared(ua)) {
                exact.insert_unique(ua, index);
            }
        }

        let mut order: Vec<usize> = (0..handlers.len()).collect();
        order.sort_by(|a, b| handlers[*b].confidence().cmp(&handlers[*a].confidence()));

        Self {
            copyright,
            graph,
            handlers,
            order,
            exact,
            config,
        }
    }

    pub fn copyright(&self) -> &str {
        &self.copyright
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn graph(&self) -> &DeviceGraph {
        &self.graph
    }

    /// Handlers in declaration order
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Handlers in the order lookups consult them
    pub fn handlers_by_confidence(&self) -> impl Iterator<Item = &Handler> {
        self.order.iter().map(|&i| &self.handlers[i])
    }

    pub fn device(&self, index: DeviceIndex) -> Option<DeviceRef<'_>> {
        self.graph.device(index)
    }

    pub fn device_by_id(&self, id: &str) -> Option<DeviceRef<'_>> {
        self.graph.find(id).and_then(|i| self.graph.device(i))
    }

    /// Best device for a user agent, or `None` when nothing matches and no
    /// default device exists.
    pub fn device_info(&self, user_agent: &str) -> Option<DeviceRef<'_>> {
        self.device_info_with_headers(&RequestHeaders::new(), user_agent)
    }

    pub fn device_info_with_headers(
        &self,
        headers: &RequestHeaders,
        user_agent: &str,
    ) -> Option<DeviceRef<'_>> {
        self.detect(user_agent, headers)
            .device
            .and_then(|d| self.graph.device(d))
    }

    /// Run every phase and report how the device was found.
    pub fn detect(&self, user_agent: &str, headers: &RequestHeaders) -> Detection {
        if let Some(exact) = self.exact_match(user_agent) {
            debug!(device = exact.device, "resolved by exact user agent");
            return Detection::matched(exact, MatchMethod::Exact);
        }

        let applicable: Vec<&Handler> = self
            .handlers_by_confidence()
            .filter(|h| h.can_handle_request(user_agent, headers))
            .collect();

        let uaprof = Self::uaprof_matches(&applicable, headers);
        if let Some(found) = resolve::closest(&self.graph, &uaprof, user_agent) {
            debug!(device = found.device, "resolved by uaprof header");
            return Detection::matched(found, MatchMethod::UaProf);
        }

        let fuzzy = self.fuzzy_matches(&applicable, user_agent);
        let found = match self.config.resolution {
            Resolution::ClosestMatch => resolve::closest(&self.graph, &fuzzy, user_agent),
            Resolution::SharedParent => {
                resolve::shared_parent(&self.graph, &fuzzy).map(|device| MatchResult {
                    device,
                    difference: fuzzy.min_difference().unwrap_or_default(),
                    handler: fuzzy.iter().next().and_then(|r| r.handler),
                })
            }
        };
        if let Some(found) = found {
            debug!(device = found.device, difference = found.difference, "resolved by fuzzy match");
            return Detection::matched(found, MatchMethod::Fuzzy);
        }

        let default = applicable
            .iter()
            .find_map(|h| h.default_device())
            .or_else(|| self.configured_default());
        debug!(device = ?default, "resolved by default device");
        Detection::fallback(default)
    }

    /// The result set resolution works on: the exact hit, else the UAProf
    /// hits, else every handler's fuzzy results in confidence order.
    pub fn matches(&self, user_agent: &str, headers: &RequestHeaders) -> Results {
        if let Some(exact) = self.exact_match(user_agent) {
            return vec![exact].into();
        }
        let applicable: Vec<&Handler> = self
            .handlers_by_confidence()
            .filter(|h| h.can_handle_request(user_agent, headers))
            .collect();
        let uaprof = Self::uaprof_matches(&applicable, headers);
        if !uaprof.is_empty() {
            return uaprof;
        }
        self.fuzzy_matches(&applicable, user_agent)
    }

    /// Closest result, else the first configured default device that exists.
    pub fn closest_match(&self, results: &Results, user_agent: &str) -> Option<DeviceIndex> {
        resolve::closest(&self.graph, results, user_agent)
            .map(|r| r.device)
            .or_else(|| self.configured_default())
    }

    /// Closest shared ancestor of all results, else the configured default.
    pub fn shared_parent(&self, results: &Results) -> Option<DeviceIndex> {
        resolve::shared_parent(&self.graph, results).or_else(|| self.configured_default())
    }

    fn configured_default(&self) -> Option<DeviceIndex> {
        resolve::default_device(&self.graph, &self.config.default_device_ids)
    }

    fn exact_match(&self, user_agent: &str) -> Option<MatchResult> {
        self.handlers_by_confidence()
            .find_map(|h| h.match_exact(user_agent))
            .or_else(|| {
                self.exact
                    .get(user_agent)
                    .next()
                    .map(MatchResult::unowned)
            })
    }

    fn uaprof_matches(applicable: &[&Handler], headers: &RequestHeaders) -> Results {
        if headers.is_empty() {
            return Results::new();
        }
        applicable
            .iter()
            .filter(|h| h.checks_uaprofs())
            .flat_map(|h| h.match_uaprof(headers))
            .collect()
    }

    fn fuzzy_matches(&self, applicable: &[&Handler], user_agent: &str) -> Results {
        match self.config.max_user_agent_length {
            Some(max) => applicable
                .iter()
                .flat_map(|h| h.match_fuzzy_truncated(user_agent, max))
                .collect(),
            None => applicable
                .iter()
                .flat_map(|h| h.match_fuzzy(user_agent))
                .collect(),
        }
    }
}
