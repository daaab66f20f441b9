//! Identity-keyed ordered collections
//!
//! `KeyedList` keeps insertion order (so manifests diff cleanly in version
//! control) while making membership an O(1) lookup on the value's
//! [`Keyed::key`]. It serializes as a plain sequence.

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strata_core::Keyed;

// ============================================================================
// KeyedList
// ============================================================================

/// An insertion-ordered list with at most one value per identity key.
///
/// The first value inserted for a key wins; later values with the same key
/// are rejected by [`insert_if_absent`](KeyedList::insert_if_absent).
#[derive(Debug, Clone)]
pub struct KeyedList<T: Keyed> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Keyed> Default for KeyedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> KeyedList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check whether a value with this key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    /// Get a mutable value by key.
    ///
    /// Keyed types keep their key fields private, so the index cannot drift.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    /// Append `item` unless its key is already present.
    ///
    /// Returns `true` if the item was added.
    pub fn insert_if_absent(&mut self, item: T) -> bool {
        let key = item.key();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.items.len());
        self.items.push(item);
        true
    }

    /// Get the value for `key`, appending `create()` first if it is missing.
    pub fn get_or_insert_with(&mut self, key: &str, create: impl FnOnce() -> T) -> &mut T {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                let item = create();
                debug_assert_eq!(item.key(), key, "created value must carry the lookup key");
                let i = self.items.len();
                self.index.insert(key.to_string(), i);
                self.items.push(item);
                i
            }
        };
        &mut self.items[i]
    }

    /// Keep only the values matching `keep`, preserving order.
    ///
    /// Returns how many values were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|item| keep(item));
        if self.items.len() != before {
            self.index = self
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| (item.key(), i))
                .collect();
        }
        before - self.items.len()
    }

    /// Iterate values in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.items.iter().map(Keyed::key)
    }

    /// View as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Keyed> FromIterator<T> for KeyedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            if !list.insert_if_absent(item) {
                tracing::debug!("Dropping duplicate keyed entry while collecting");
            }
        }
        list
    }
}

impl<T: Keyed> From<Vec<T>> for KeyedList<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Keyed> From<KeyedList<T>> for Vec<T> {
    fn from(list: KeyedList<T>) -> Self {
        list.items
    }
}

impl<'a, T: Keyed> IntoIterator for &'a KeyedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Keyed + PartialEq> PartialEq for KeyedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Keyed + Serialize> Serialize for KeyedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de, T: Keyed + Deserialize<'de>> Deserialize<'de> for KeyedList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
