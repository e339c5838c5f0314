use std::collections::HashMap;
use std::hash::Hash;

/// A `HashMap` wrapper whose `insert`/`remove` require the caller to have
/// validated the key first. The [`Manager`](crate::Manager) performs all
/// validation before touching an index, so a collision or missing key at this
/// layer is an internal invariant violation, not a recoverable error.
pub struct CheckedMap<K: Eq + Hash, V> {
    inner: HashMap<K, V>,
}

impl<K: Eq + Hash, V> CheckedMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    /// # Panics
    ///
    /// Panics if the key is already present. Check first.
    pub fn insert(&mut self, key: K, value: V) {
        if self.inner.contains_key(&key) {
            panic!("Cannot insert and replace value for given key. Check first.")
        }

        self.inner.insert(key, value);
    }

    /// # Panics
    ///
    /// Panics if the key is absent. Check first.
    pub fn remove(&mut self, key: &K) -> V {
        let Some(value) = self.inner.remove(key) else {
            panic!("Cannot remove value for key with non-existent value. Check whether map contains key first.")
        };
        value
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<K, V> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl<K: Eq + Hash, V> Default for CheckedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
