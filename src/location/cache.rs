//! In-memory coordinate cache, one entry per LocationKey.
//!
//! Built fresh on every run; it only lives as long as the resolver and is
//! never written to disk on its own.

use super::types::{Coordinates, LocationKey};
use std::collections::HashMap;

/// Resolved coordinates per key, `None` meaning "tried and unresolved".
#[derive(Debug, Default)]
pub struct CoordinateCache {
    entries: HashMap<LocationKey, Option<Coordinates>>,
}

impl CoordinateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(None)` for a key that was tried and failed, `None` for a key never seen.
    pub fn get(&self, key: &LocationKey) -> Option<Option<Coordinates>> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &LocationKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn put(&mut self, key: LocationKey, coords: Option<Coordinates>) {
        self.entries.insert(key, coords);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocationKey, Option<Coordinates>)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    /// Keys stored with the unresolved marker, sorted.
    pub fn unresolved(&self) -> Vec<LocationKey> {
        let mut keys: Vec<LocationKey> = self
            .entries
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
