//! Hash indices owned by a handler

use std::sync::Arc;

use ahash::{AHashMap, AHashSet, RandomState};

use crate::device::DeviceIndex;
use crate::matching::Candidate;

/// A registered key and the device it resolves to
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub key: Arc<str>,
    pub device: DeviceIndex,
}

/// Hash-bucketed index from a string key to devices.
///
/// Buckets are keyed by the string's hash; lookups confirm byte-exact
/// equality before returning a device. Entries keep registration order so
/// fuzzy matchers iterate candidates deterministically.
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    entries: Vec<IndexEntry>,
    buckets: AHashMap<u64, Vec<usize>>,
    hasher: RandomState,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn hash(&self, key: &str) -> u64 {
        self.hasher.hash_one(key)
    }

    /// Register a key that may map to at most one device; a key already
    /// present keeps its first device.
    pub fn insert_unique(&mut self, key: Arc<str>, device: DeviceIndex) -> bool {
        let hash = self.hash(&key);
        let bucket = self.buckets.entry(hash).or_default();
        if bucket.iter().any(|&e| *self.entries[e].key == *key) {
            return false;
        }
        bucket.push(self.entries.len());
        self.entries.push(IndexEntry { key, device });
        true
    }

    /// Register a key that may map to several devices; an identical
    /// (key, device) pair is only stored once.
    pub fn insert(&mut self, key: Arc<str>, device: DeviceIndex) -> bool {
        let hash = self.hash(&key);
        let bucket = self.buckets.entry(hash).or_default();
        if bucket
            .iter()
            .any(|&e| self.entries[e].device == device && *self.entries[e].key == *key)
        {
            return false;
        }
        bucket.push(self.entries.len());
        self.entries.push(IndexEntry { key, device });
        true
    }

    /// Devices registered under exactly this key
    pub fn get<'a>(&'a self, key: &'a str) -> impl Iterator<Item = DeviceIndex> + 'a {
        self.buckets
            .get(&self.hash(key))
            .into_iter()
            .flatten()
            .map(|&e| &self.entries[e])
            .filter(move |entry| *entry.key == *key)
            .map(|entry| entry.device)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn candidates(&self) -> impl Iterator<Item = Candidate<'_>> + Clone {
        self.entries.iter().map(|e| Candidate {
            device: e.device,
            user_agent: &e.key,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a handler registers during load
#[derive(Debug, Clone, Default)]
pub struct HandlerIndex {
    pub user_agents: HashIndex,
    pub uaprofs: HashIndex,
    pub uaprof_hosts: AHashSet<String>,
}
