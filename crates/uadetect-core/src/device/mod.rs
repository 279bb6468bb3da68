//! Device / capability graph
//!
//! Devices live in a flat arena ([`DeviceGraph`]). Each record holds its own
//! capability map and an optional fallback index pointing at its parent;
//! capability lookups walk that chain upward until a value is found or the
//! chain ends.
//!
//! ```text
//! generic ── generic_android ── samsung_galaxy ── samsung_galaxy_s3
//!                                                   └─ (variant record)
//! ```
//!
//! Fallback links always point at a record that was stored earlier, so the
//! chain is acyclic and terminates at a root with no fallback.

mod graph;

use std::collections::BTreeMap;

use crate::strings::StringHandle;

pub use graph::{Ancestors, DeviceGraph, DeviceRef};

/// Position of a device record in the [`DeviceGraph`] arena
pub type DeviceIndex = usize;

/// A single device record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub(crate) id: StringHandle,
    pub(crate) user_agent: Option<StringHandle>,
    pub(crate) capabilities: BTreeMap<StringHandle, Vec<StringHandle>>,
    pub(crate) fallback: Option<DeviceIndex>,
    pub(crate) variant: bool,
}

impl DeviceInfo {
    pub fn new(id: StringHandle) -> Self {
        Self {
            id,
            user_agent: None,
            capabilities: BTreeMap::new(),
            fallback: None,
            variant: false,
        }
    }

    /// Record for an additional user agent of an existing device.
    ///
    /// Shares the parent's id, carries no capabilities of its own and
    /// falls back to the parent record.
    pub fn variant_of(parent: DeviceIndex, id: StringHandle, user_agent: StringHandle) -> Self {
        Self {
            id,
            user_agent: Some(user_agent),
            capabilities: BTreeMap::new(),
            fallback: Some(parent),
            variant: true,
        }
    }

    pub fn with_user_agent(mut self, user_agent: StringHandle) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    pub fn with_fallback(mut self, fallback: DeviceIndex) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn id(&self) -> StringHandle {
        self.id
    }

    pub fn user_agent(&self) -> Option<StringHandle> {
        self.user_agent
    }

    pub fn fallback(&self) -> Option<DeviceIndex> {
        self.fallback
    }

    pub fn is_variant(&self) -> bool {
        self.variant
    }

    pub fn capabilities(&self) -> &BTreeMap<StringHandle, Vec<StringHandle>> {
        &self.capabilities
    }

    /// Set a capability on this record only, replacing any previous values.
    pub fn set_capability(&mut self, name: StringHandle, values: Vec<StringHandle>) {
        self.capabilities.insert(name, values);
    }
}
