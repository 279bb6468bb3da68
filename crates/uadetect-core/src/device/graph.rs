//! Flat device arena with fallback-chain traversal

use std::collections::BTreeMap;

use ahash::AHashMap;

use super::{DeviceIndex, DeviceInfo};
use crate::strings::{StringHandle, StringTable};

/// Arena of device records sharing one string table
#[derive(Debug, Default, Clone)]
pub struct DeviceGraph {
    strings: StringTable,
    devices: Vec<DeviceInfo>,
    by_id: AHashMap<StringHandle, DeviceIndex>,
}

impl DeviceGraph {
    pub fn new(strings: StringTable) -> Self {
        Self {
            strings,
            devices: Vec::new(),
            by_id: AHashMap::new(),
        }
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub(crate) fn strings_mut(&mut self) -> &mut StringTable {
        &mut self.strings
    }

    /// Append a record. Its fallback, if any, must already be stored.
    pub(crate) fn push(&mut self, device: DeviceInfo) -> DeviceIndex {
        let index = self.devices.len();
        debug_assert!(device.fallback.map_or(true, |f| f < index));
        if !device.variant {
            self.by_id.entry(device.id).or_insert(index);
        }
        self.devices.push(device);
        index
    }

    pub(crate) fn get_mut(&mut self, index: DeviceIndex) -> Option<&mut DeviceInfo> {
        self.devices.get_mut(index)
    }

    pub fn get(&self, index: DeviceIndex) -> Option<&DeviceInfo> {
        self.devices.get(index)
    }

    pub fn device(&self, index: DeviceIndex) -> Option<DeviceRef<'_>> {
        self.devices.get(index).map(|_| DeviceRef { graph: self, index })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceIndex, &DeviceInfo)> {
        self.devices.iter().enumerate()
    }

    /// Primary record for a device id
    pub fn find(&self, id: &str) -> Option<DeviceIndex> {
        let handle = self.strings.find(id)?;
        self.by_id.get(&handle).copied()
    }

    pub fn id(&self, index: DeviceIndex) -> Option<&str> {
        self.get(index).and_then(|d| self.strings.get(d.id))
    }

    pub fn user_agent(&self, index: DeviceIndex) -> Option<&str> {
        self.get(index)
            .and_then(|d| d.user_agent)
            .and_then(|ua| self.strings.get(ua))
    }

    /// The record itself followed by each fallback up to the root.
    pub fn ancestors(&self, index: DeviceIndex) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.get(index).map(|_| index),
            remaining: self.devices.len(),
        }
    }

    /// Whether `ancestor` appears on the chain starting at `device` (inclusive)
    pub fn is_ancestor(&self, ancestor: DeviceIndex, device: DeviceIndex) -> bool {
        self.ancestors(device).any(|a| a == ancestor)
    }

    /// Capability values, walking the fallback chain until the name is set.
    pub fn capability_values(&self, index: DeviceIndex, name: &str) -> Option<Vec<&str>> {
        let name = self.strings.find(name)?;
        self.ancestors(index)
            .filter_map(|a| self.devices[a].capabilities.get(&name))
            .next()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| self.strings.get(*v))
                    .collect()
            })
    }

    /// First value of a capability, walking the fallback chain.
    pub fn capability(&self, index: DeviceIndex, name: &str) -> Option<&str> {
        self.capability_values(index, name)
            .and_then(|values| values.into_iter().next())
    }

    /// Every capability visible from a record, nearest definition winning.
    pub fn resolved_capabilities(&self, index: DeviceIndex) -> BTreeMap<&str, Vec<&str>> {
        let mut resolved = BTreeMap::new();
        for ancestor in self.ancestors(index) {
            for (name, values) in &self.devices[ancestor].capabilities {
                let Some(name) = self.strings.get(*name) else {
                    continue;
                };
                resolved.entry(name).or_insert_with(|| {
                    values
                        .iter()
                        .filter_map(|v| self.strings.get(*v))
                        .collect()
                });
            }
        }
        resolved
    }

    /// Child lists for every record, in arena order.
    pub fn children(&self) -> Vec<Vec<DeviceIndex>> {
        let mut children = vec![Vec::new(); self.devices.len()];
        for (index, device) in self.devices.iter().enumerate() {
            if let Some(parent) = device.fallback {
                children[parent].push(index);
            }
        }
        children
    }

    pub fn roots(&self) -> impl Iterator<Item = DeviceIndex> + '_ {
        self.devices
            .iter()
            .enumerate()
            .filter(|(_, d)| d.fallback.is_none())
            .map(|(i, _)| i)
    }
}

/// Iterator over a fallback chain, bounded by the arena size
pub struct Ancestors<'a> {
    graph: &'a DeviceGraph,
    next: Option<DeviceIndex>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = DeviceIndex;

    fn next(&mut self) -> Option<DeviceIndex> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.graph.get(current).and_then(|d| d.fallback);
        Some(current)
    }
}

/// Borrowed view of one device record with its strings resolved
#[derive(Clone, Copy)]
pub struct DeviceRef<'a> {
    graph: &'a DeviceGraph,
    index: DeviceIndex,
}

impl<'a> DeviceRef<'a> {
    pub fn index(&self) -> DeviceIndex {
        self.index
    }

    pub fn id(&self) -> &'a str {
        self.graph.id(self.index).unwrap_or_default()
    }

    pub fn user_agent(&self) -> Option<&'a str> {
        self.graph.user_agent(self.index)
    }

    pub fn fallback(&self) -> Option<DeviceRef<'a>> {
        self.graph
            .get(self.index)
            .and_then(|d| d.fallback)
            .and_then(|f| self.graph.device(f))
    }

    pub fn is_variant(&self) -> bool {
        self.graph.get(self.index).is_some_and(|d| d.variant)
    }

    pub fn capability(&self, name: &str) -> Option<&'a str> {
        self.graph.capability(self.index, name)
    }

    pub fn capability_values(&self, name: &str) -> Option<Vec<&'a str>> {
        self.graph.capability_values(self.index, name)
    }

    pub fn capabilities(&self) -> BTreeMap<&'a str, Vec<&'a str>> {
        self.graph.resolved_capabilities(self.index)
    }
}

impl std::fmt::Debug for DeviceRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRef")
            .field("index", &self.index)
            .field("id", &self.id())
            .field("user_agent", &self.user_agent())
            .finish()
    }
}
