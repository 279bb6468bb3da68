//! Provider configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a merged result set is reduced to one device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Lowest difference, then the final similarity tie-break
    #[default]
    ClosestMatch,
    /// Closest ancestor shared by every candidate
    SharedParent,
}

/// Provider configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Device ids tried in order when nothing matches
    pub default_device_ids: Vec<String>,
    pub resolution: Resolution,
    /// Memoize candidate segments for regex-segment handlers
    pub cache_segments: bool,
    pub segment_cache_shards: usize,
    /// Queries longer than this many characters are cut before fuzzy
    /// matching. Exact and UAProf lookups always see the full string.
    pub max_user_agent_length: Option<usize>,
    /// Handler name -> default device id, overriding the dataset
    pub handler_defaults: BTreeMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default_device_ids: vec!["generic".to_string()],
            resolution: Resolution::ClosestMatch,
            cache_segments: true,
            segment_cache_shards: 16,
            max_user_agent_length: Some(512),
            handler_defaults: BTreeMap::new(),
        }
    }
}

impl ProviderConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_default_devices<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_device_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_segment_cache(mut self, enabled: bool) -> Self {
        self.cache_segments = enabled;
        self
    }

    pub fn with_max_user_agent_length(mut self, max: Option<usize>) -> Self {
        self.max_user_agent_length = max;
        self
    }

    pub fn with_handler_default(
        mut self,
        handler: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        self.handler_defaults.insert(handler.into(), device_id.into());
        self
    }
}
