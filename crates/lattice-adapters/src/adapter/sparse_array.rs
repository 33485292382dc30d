//! Key-indexed collection with keys kept in ascending order.

use super::snapshot::ItemCollection;

/// Map from `i64` keys to values, stored as parallel sorted vectors.
///
/// Lookups by key are binary searches; iteration and positional access follow
/// ascending key order.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseArray<V> {
    keys: Vec<i64>,
    values: Vec<V>,
}

impl<V> Default for SparseArray<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SparseArray<V> {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Creates an empty array with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Value stored under `key`.
    pub fn get(&self, key: i64) -> Option<&V> {
        self.index_of_key(key).map(|i| &self.values[i])
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: i64) -> bool {
        self.keys.binary_search(&key).is_ok()
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn put(&mut self, key: i64, value: V) -> Option<V> {
        match self.keys.binary_search(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.values[i], value)),
            Err(i) => {
                self.keys.insert(i, key);
                self.values.insert(i, value);
                None
            }
        }
    }

    /// Removes the entry for `key`.
    pub fn remove(&mut self, key: i64) -> Option<V> {
        let i = self.keys.binary_search(&key).ok()?;
        Some(self.remove_at(i).1)
    }

    /// Removes the entry at `index`. Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> (i64, V) {
        (self.keys.remove(index), self.values.remove(index))
    }

    /// Key at `index`.
    pub fn key_at(&self, index: usize) -> Option<i64> {
        self.keys.get(index).copied()
    }

    /// Value at `index`.
    pub fn value_at(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    /// Position of `key`.
    pub fn index_of_key(&self, key: i64) -> Option<usize> {
        self.keys.binary_search(&key).ok()
    }

    /// Position of the first value matching `matches`.
    pub fn index_of_value_by(&self, matches: impl Fn(&V) -> bool) -> Option<usize> {
        self.values.iter().position(matches)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
    }

    /// Keeps only entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(i64, &V) -> bool) {
        let mut write = 0;
        for read in 0..self.keys.len() {
            if keep(self.keys[read], &self.values[read]) {
                self.keys.swap(write, read);
                self.values.swap(write, read);
                write += 1;
            }
        }
        self.keys.truncate(write);
        self.values.truncate(write);
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &V)> {
        self.keys.iter().copied().zip(self.values.iter())
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> &[i64] {
        &self.keys
    }
}

impl<V> FromIterator<(i64, V)> for SparseArray<V> {
    fn from_iter<I: IntoIterator<Item = (i64, V)>>(iter: I) -> Self {
        let mut array = SparseArray::new();
        for (key, value) in iter {
            array.put(key, value);
        }
        array
    }
}

impl<V> Extend<(i64, V)> for SparseArray<V> {
    fn extend<I: IntoIterator<Item = (i64, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

impl<V: Clone + Send + Sync + 'static> ItemCollection for SparseArray<V> {
    fn item_count(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_keeps_keys_sorted() {
        let mut array = SparseArray::new();
        array.put(30, "c");
        array.put(-5, "a");
        array.put(10, "b");

        assert_eq!(array.keys(), &[-5, 10, 30]);
        assert_eq!(array.value_at(1), Some(&"b"));
        assert_eq!(array.put(10, "B"), Some("b"));
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn test_remove_and_lookup() {
        let mut array: SparseArray<&str> = [(1, "one"), (2, "two"), (3, "three")].into_iter().collect();
        assert_eq!(array.remove(2), Some("two"));
        assert_eq!(array.remove(2), None);
        assert_eq!(array.index_of_key(3), Some(1));
        assert_eq!(array.index_of_value_by(|v| *v == "one"), Some(0));
        assert!(!array.contains_key(2));
    }

    #[test]
    fn test_retain() {
        let mut array: SparseArray<i32> = (0..6).map(|k| (k, k as i32 * 10)).collect();
        array.retain(|key, _| key % 2 == 0);
        assert_eq!(array.keys(), &[0, 2, 4]);
        assert_eq!(array.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![0, 20, 40]);
    }
}
