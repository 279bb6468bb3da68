//! Interned string table
//!
//! Every piece of repeated text in a dataset (device ids, user agents,
//! capability names and values) is stored once and referred to by a
//! [`StringHandle`]. The table is append-only: handles stay valid for the
//! lifetime of the table.

use std::sync::Arc;

use ahash::AHashMap;

/// Stable handle into a [`StringTable`]
pub type StringHandle = u32;

/// Ordered, append-only, deduplicating list of strings
#[derive(Debug, Default, Clone)]
pub struct StringTable {
    values: Vec<Arc<str>>,
    lookup: AHashMap<Arc<str>, StringHandle>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            lookup: AHashMap::with_capacity(capacity),
        }
    }

    /// Intern a value, returning the existing handle if it is already present.
    pub fn add(&mut self, value: &str) -> StringHandle {
        if let Some(&handle) = self.lookup.get(value) {
            return handle;
        }
        let handle = self.values.len() as StringHandle;
        let value: Arc<str> = Arc::from(value);
        self.values.push(value.clone());
        self.lookup.insert(value, handle);
        handle
    }

    /// Append a value read from a dataset, keeping its position.
    ///
    /// Datasets refer to strings by position, so a repeated entry still
    /// occupies its own slot; lookups by value resolve to the first one.
    pub(crate) fn push(&mut self, value: String) -> StringHandle {
        let handle = self.values.len() as StringHandle;
        let value: Arc<str> = Arc::from(value);
        self.lookup.entry(value.clone()).or_insert(handle);
        self.values.push(value);
        handle
    }

    pub fn get(&self, handle: StringHandle) -> Option<&str> {
        self.values.get(handle as usize).map(|v| v.as_ref())
    }

    /// Shared pointer to a value, for indices that outlive a borrow
    pub(crate) fn get_shared(&self, handle: StringHandle) -> Option<Arc<str>> {
        self.values.get(handle as usize).cloned()
    }

    /// Handle of a value, if it has been interned
    pub fn find(&self, value: &str) -> Option<StringHandle> {
        self.lookup.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_deduplicates() {
        let mut table = StringTable::new();
        let a = table.add("is_wireless_device");
        let b = table.add("true");
        let c = table.add("is_wireless_device");

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a), Some("is_wireless_device"));
        assert_eq!(table.get(b), Some("true"));
    }

    #[test]
    fn get_out_of_range() {
        let table = StringTable::new();
        assert!(table.get(0).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn push_keeps_positions() {
        let mut table = StringTable::new();
        assert_eq!(table.push("a".into()), 0);
        assert_eq!(table.push("b".into()), 1);
        assert_eq!(table.push("a".into()), 2);

        assert_eq!(table.get(2), Some("a"));
        assert_eq!(table.find("a"), Some(0));
        assert_eq!(table.add("a"), 0);
        assert_eq!(table.iter().collect::<Vec<_>>(), vec!["a", "b", "a"]);
    }
}
