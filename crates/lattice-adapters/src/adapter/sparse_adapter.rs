//! Adapter over a key-indexed collection.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use lattice_adapters_core::logging::targets;

use super::array_adapter::PredicateSlot;
use super::config::AdapterConfig;
use super::filter::{Filter, FilterStrategy};
use super::renderer::ItemRenderer;
use super::signals::AdapterSignals;
use super::snapshot::{Snapshot, SnapshotStore};
use super::sparse_array::SparseArray;
use crate::error::{AdapterError, AdapterResult, check_index};

/// Predicate over a keyed item.
pub type KeyedPredicate<T> = Arc<dyn Fn(i64, &T, &str) -> bool + Send + Sync>;

type Items<T> = SparseArray<Arc<T>>;

impl<T: Send + Sync + 'static> FilterStrategy<Items<T>> for PredicateSlot<KeyedPredicate<T>> {
    fn perform(&self, mut source: Items<T>, constraint: &str) -> Items<T> {
        match self.get() {
            Some(predicate) => {
                source.retain(|key, item| predicate(key, &**item, constraint));
                source
            }
            None => {
                warn!(target: targets::FILTER, constraint, "no filter predicate registered, keeping all items");
                source
            }
        }
    }
}

/// A thread-safe, filterable adapter over items indexed by `i64` keys.
///
/// Items are ordered by ascending key. Keys double as item ids, so ids are
/// always stable. Removal by value uses identity, not equality.
pub struct SparseArrayAdapter<T> {
    store: Arc<SnapshotStore<Items<T>>>,
    filter: Filter<Items<T>>,
    predicate: Arc<PredicateSlot<KeyedPredicate<T>>>,
}

impl<T: Send + Sync + 'static> SparseArrayAdapter<T> {
    /// Creates an empty adapter with the default configuration.
    pub fn new() -> Self {
        Self::with_config(std::iter::empty(), AdapterConfig::default())
    }

    /// Creates an adapter over `entries`.
    pub fn with_config(entries: impl IntoIterator<Item = (i64, T)>, config: AdapterConfig) -> Self {
        let items: Items<T> = entries.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();
        let store = Arc::new(SnapshotStore::new(items, &config));
        let predicate: Arc<PredicateSlot<KeyedPredicate<T>>> = Arc::new(PredicateSlot::new(None));
        let filter = Filter::new(&store, predicate.clone(), config.executor.clone());
        Self {
            store,
            filter,
            predicate,
        }
    }

    /// Sets the filter predicate.
    pub fn with_filter_predicate<F>(self, predicate: F) -> Self
    where
        F: Fn(i64, &T, &str) -> bool + Send + Sync + 'static,
    {
        self.predicate.set(Arc::new(predicate));
        self
    }

    /// The filter handle.
    pub fn filter(&self) -> &Filter<Items<T>> {
        &self.filter
    }

    /// The change signals.
    pub fn signals(&self) -> &AdapterSignals {
        self.store.signals()
    }

    /// Number of visible entries.
    pub fn len(&self) -> usize {
        self.store.read(|s| s.visible().len())
    }

    /// Whether no entries are visible.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The visible item at `position`.
    pub fn get(&self, position: usize) -> AdapterResult<Arc<T>> {
        self.store.read(|s| {
            let items = s.visible();
            items.value_at(position).cloned().ok_or(AdapterError::IndexOutOfBounds {
                index: position,
                len: items.len(),
            })
        })
    }

    /// The item stored under `key`, ignoring the active filter.
    pub fn get_by_key(&self, key: i64) -> Option<Arc<T>> {
        self.store.read(|s| s.full().get(key).cloned())
    }

    /// Key of the visible entry at `position`.
    pub fn key_at(&self, position: usize) -> AdapterResult<i64> {
        self.store.read(|s| visible_key(s, position))
    }

    /// Identifier of the visible entry at `position`: its key.
    pub fn item_id(&self, position: usize) -> AdapterResult<i64> {
        self.key_at(position)
    }

    /// Always `true`: keys are ids.
    pub fn has_stable_ids(&self) -> bool {
        true
    }

    /// Visible position of `key`.
    pub fn index_of_key(&self, key: i64) -> Option<usize> {
        self.store.read(|s| s.visible().index_of_key(key))
    }

    /// Visible position of `item`, compared by identity.
    pub fn index_of_value(&self, item: &Arc<T>) -> Option<usize> {
        self.store
            .read(|s| s.visible().index_of_value_by(|v| Arc::ptr_eq(v, item)))
    }

    /// Whether `key` is present, ignoring the active filter.
    pub fn contains_key(&self, key: i64) -> bool {
        self.store.read(|s| s.full().contains_key(key))
    }

    /// The visible entries.
    pub fn visible_items(&self) -> Items<T> {
        self.store.read(|s| s.visible().clone())
    }

    /// Every entry, ignoring the active filter.
    pub fn all_items(&self) -> Items<T> {
        self.store.read(|s| s.full().clone())
    }

    /// Renders the visible item at `position`.
    pub fn render<R: ItemRenderer<T>>(&self, position: usize, renderer: &R) -> AdapterResult<R::View> {
        let item = self.get(position)?;
        Ok(renderer.render(position, &item))
    }

    /// Stores `item` under `key`, returning the item it replaced.
    pub fn put(&self, key: i64, item: T) -> Option<Arc<T>> {
        let item = Arc::new(item);
        self.store
            .mutate(&self.filter, |s| (true, s.full_mut().put(key, item)))
    }

    /// Stores several entries.
    pub fn put_all(&self, entries: impl IntoIterator<Item = (i64, T)>) -> bool {
        let entries: Vec<(i64, Arc<T>)> = entries.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();
        self.store.mutate(&self.filter, |s| {
            let changed = !entries.is_empty();
            s.full_mut().extend(entries);
            (changed, changed)
        })
    }

    /// Removes the entry for `key`.
    pub fn remove_key(&self, key: i64) -> Option<Arc<T>> {
        self.store.mutate(&self.filter, |s| {
            let removed = s.full_mut().remove(key);
            (removed.is_some(), removed)
        })
    }

    /// Removes `item`, compared by identity. Returns `false` if absent.
    pub fn remove(&self, item: &Arc<T>) -> bool {
        self.store.mutate(&self.filter, |s| {
            let full = s.full_mut();
            match full.index_of_value_by(|v| Arc::ptr_eq(v, item)) {
                Some(index) => {
                    full.remove_at(index);
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    /// Removes the visible entry at `position`.
    pub fn remove_at(&self, position: usize) -> AdapterResult<Arc<T>> {
        self.store.try_mutate(&self.filter, |s| {
            let key = visible_key(s, position)?;
            let removed = s.full_mut().remove(key);
            Ok((removed.is_some(), removed))
        })
        .and_then(|removed| removed.ok_or(AdapterError::StaleItem { index: position }))
    }

    /// Replaces the item of the visible entry at `position`.
    pub fn update(&self, position: usize, item: T) -> AdapterResult<Option<Arc<T>>> {
        let item = Arc::new(item);
        self.store.try_mutate(&self.filter, |s| {
            let key = visible_key(s, position)?;
            if !s.full().contains_key(key) {
                return Err(AdapterError::StaleItem { index: position });
            }
            Ok((true, s.full_mut().put(key, item)))
        })
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.store.mutate(&self.filter, |s| {
            let items = s.full_mut();
            let changed = !items.is_empty();
            items.clear();
            (changed, ())
        });
    }

    /// Replaces every entry.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = (i64, T)>) {
        let items: Items<T> = entries.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();
        self.store.mutate(&self.filter, |s| {
            *s.full_mut() = items;
            (true, ())
        });
    }

    /// Sets the notify flag. Re-enabling it emits `data_changed` immediately.
    pub fn set_notify_on_change(&self, notify: bool) {
        self.store.set_notify_on_change(notify);
    }

    /// Emits `data_changed` and re-enables automatic notification.
    pub fn notify_data_set_changed(&self) {
        self.store.notify_data_set_changed();
    }
}

fn visible_key<T: Send + Sync + 'static>(snapshot: &Snapshot<Items<T>>, position: usize) -> AdapterResult<i64> {
    let items = snapshot.visible();
    check_index(position, items.len())?;
    Ok(items.keys()[position])
}

impl<T: Send + Sync + 'static> Default for SparseArrayAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for SparseArrayAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, filtered) = self.store.read(|s| (s.visible().len(), s.is_filtered()));
        f.debug_struct("SparseArrayAdapter")
            .field("len", &len)
            .field("filtered", &filtered)
            .finish()
    }
}

static_assertions::assert_impl_all!(SparseArrayAdapter<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn contacts() -> SparseArrayAdapter<String> {
        SparseArrayAdapter::with_config(
            [(42, "Zoe"), (7, "Adam"), (19, "Mia")].map(|(k, v)| (k, v.to_string())),
            AdapterConfig::inline(),
        )
        .with_filter_predicate(|key, name, constraint| {
            name.to_lowercase().contains(&constraint.to_lowercase()) || key.to_string() == constraint
        })
    }

    #[test]
    fn test_ordered_by_key() {
        let adapter = contacts();
        assert_eq!(adapter.key_at(0).unwrap(), 7);
        assert_eq!(*adapter.get(2).unwrap(), "Zoe");
        assert_eq!(adapter.item_id(1).unwrap(), 19);
        assert!(adapter.has_stable_ids());
    }

    #[test]
    fn test_put_replaces() {
        let adapter = contacts();
        let old = adapter.put(19, "Mila".to_string());
        assert_eq!(old.as_deref().map(String::as_str), Some("Mia"));
        assert_eq!(adapter.len(), 3);
        assert_eq!(*adapter.get_by_key(19).unwrap(), "Mila");
    }

    #[test]
    fn test_remove_uses_identity() {
        let adapter = contacts();
        let adam = adapter.get(0).unwrap();
        let lookalike = Arc::new("Adam".to_string());

        assert!(!adapter.remove(&lookalike));
        assert_eq!(adapter.index_of_value(&adam), Some(0));
        assert!(adapter.remove(&adam));
        assert_eq!(adapter.len(), 2);
        assert!(adapter.remove_key(7).is_none());
    }

    #[test]
    fn test_filter_and_mutation_replay() {
        let adapter = contacts();
        adapter.filter().filter("m");
        assert_eq!(adapter.len(), 2);
        assert_eq!(adapter.index_of_key(42), None);

        adapter.put(3, "Sam".to_string());
        assert_eq!(adapter.len(), 3);
        assert_eq!(adapter.key_at(0).unwrap(), 3);

        let removed = adapter.remove_at(0).unwrap();
        assert_eq!(*removed, "Sam");
        assert!(!adapter.contains_key(3));

        adapter.filter().filter("");
        assert_eq!(adapter.len(), 3);
    }

    #[test]
    fn test_update_by_position_while_filtered() {
        let adapter = contacts();
        adapter.filter().filter("42");
        assert_eq!(adapter.len(), 1);

        adapter.update(0, "Zoey".to_string()).unwrap();
        assert_eq!(*adapter.get_by_key(42).unwrap(), "Zoey");
        assert!(adapter.update(5, "x".to_string()).is_err());
    }
}
