//! Caches for derived group keys.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Hook for caching `group_of` results per child.
///
/// Entries are keyed by child identity. The adapter evicts a child's entry
/// whenever it removes or replaces that child.
pub trait GroupKeyCache<K, C>: Send + Sync {
    /// Cached key for `child`.
    fn get(&self, child: &Arc<C>) -> Option<K>;

    /// Records the key computed for `child`.
    fn put(&self, child: &Arc<C>, key: &K);

    /// Forgets `child`.
    fn evict(&self, child: &Arc<C>);

    /// Forgets everything.
    fn clear(&self);
}

/// The default: recompute the key every time.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeyCache;

impl<K, C> GroupKeyCache<K, C> for NoKeyCache {
    fn get(&self, _child: &Arc<C>) -> Option<K> {
        None
    }

    fn put(&self, _child: &Arc<C>, _key: &K) {}

    fn evict(&self, _child: &Arc<C>) {}

    fn clear(&self) {}
}

/// Caches keys by child pointer.
#[derive(Debug)]
pub struct IdentityKeyCache<K> {
    entries: Mutex<HashMap<usize, K>>,
}

impl<K> Default for IdentityKeyCache<K> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> IdentityKeyCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn address<C>(child: &Arc<C>) -> usize {
    Arc::as_ptr(child) as usize
}

impl<K: Clone + Send, C> GroupKeyCache<K, C> for IdentityKeyCache<K> {
    fn get(&self, child: &Arc<C>) -> Option<K> {
        self.entries.lock().get(&address(child)).cloned()
    }

    fn put(&self, child: &Arc<C>, key: &K) {
        self.entries.lock().insert(address(child), key.clone());
    }

    fn evict(&self, child: &Arc<C>) {
        self.entries.lock().remove(&address(child));
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}
