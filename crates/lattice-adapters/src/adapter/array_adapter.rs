//! Flat list adapter.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use lattice_adapters_core::logging::targets;

use super::config::AdapterConfig;
use super::filter::{Filter, FilterStrategy};
use super::renderer::ItemRenderer;
use super::signals::AdapterSignals;
use super::snapshot::{Snapshot, SnapshotStore};
use crate::error::{AdapterError, AdapterResult, check_index};

/// Predicate deciding whether an item matches a filter constraint.
pub type TextPredicate<T> = Arc<dyn Fn(&T, &str) -> bool + Send + Sync>;

/// Function producing a stable identifier for an item.
pub type StableIdFn<T> = Arc<dyn Fn(&T) -> u64 + Send + Sync>;

/// Case-insensitive prefix matcher over an item's display text.
///
/// Matches when the whole text, or any space-separated word of it, starts
/// with the constraint.
pub fn prefix_predicate<T: fmt::Display + 'static>() -> TextPredicate<T> {
    Arc::new(|item: &T, constraint: &str| {
        let prefix = constraint.to_lowercase();
        let text = item.to_string().to_lowercase();
        text.starts_with(&prefix) || text.split(' ').any(|word| word.starts_with(&prefix))
    })
}

/// Replaceable predicate shared between an adapter and its filter.
pub(crate) struct PredicateSlot<P> {
    predicate: RwLock<Option<P>>,
}

impl<P: Clone> PredicateSlot<P> {
    pub(crate) fn new(predicate: Option<P>) -> Self {
        Self {
            predicate: RwLock::new(predicate),
        }
    }

    pub(crate) fn get(&self) -> Option<P> {
        self.predicate.read().clone()
    }

    pub(crate) fn set(&self, predicate: P) {
        *self.predicate.write() = Some(predicate);
    }
}

impl<T: Send + Sync + 'static> FilterStrategy<Vec<Arc<T>>> for PredicateSlot<TextPredicate<T>> {
    fn perform(&self, source: Vec<Arc<T>>, constraint: &str) -> Vec<Arc<T>> {
        match self.get() {
            Some(predicate) => source
                .into_iter()
                .filter(|item| predicate(&**item, constraint))
                .collect(),
            None => {
                warn!(target: targets::FILTER, constraint, "no filter predicate registered, keeping all items");
                source
            }
        }
    }
}

/// Maps a visible position to the matching position in the full collection.
///
/// Unfiltered this is the position itself; filtered it is an identity search.
pub(crate) fn full_position<T>(snapshot: &Snapshot<Vec<Arc<T>>>, position: usize) -> AdapterResult<usize>
where
    T: Send + Sync + 'static,
{
    match snapshot {
        Snapshot::Unfiltered(items) => {
            check_index(position, items.len())?;
            Ok(position)
        }
        Snapshot::Filtered { visible, full } => {
            check_index(position, visible.len())?;
            let target = &visible[position];
            full.iter()
                .position(|item| Arc::ptr_eq(item, target))
                .ok_or(AdapterError::StaleItem { index: position })
        }
    }
}

/// A thread-safe, filterable list of items.
///
/// Positions always refer to the visible collection. While a filter is
/// active, mutations apply to the full collection and the filter is replayed
/// with the last constraint.
///
/// # Example
///
/// ```
/// use lattice_adapters::adapter::{AdapterConfig, ArrayAdapter, prefix_predicate};
///
/// let adapter = ArrayAdapter::with_config(["apple", "banana", "blueberry"], AdapterConfig::inline())
///     .with_filter_predicate(prefix_predicate());
///
/// adapter.filter().filter("b");
/// assert_eq!(adapter.len(), 2);
///
/// adapter.filter().filter("");
/// assert_eq!(adapter.len(), 3);
/// ```
pub struct ArrayAdapter<T> {
    store: Arc<SnapshotStore<Vec<Arc<T>>>>,
    filter: Filter<Vec<Arc<T>>>,
    predicate: Arc<PredicateSlot<TextPredicate<T>>>,
    stable_ids: Option<StableIdFn<T>>,
}

impl<T: Send + Sync + 'static> ArrayAdapter<T> {
    /// Creates an empty adapter with the default configuration.
    pub fn new() -> Self {
        Self::with_config(std::iter::empty(), AdapterConfig::default())
    }

    /// Creates an adapter over `items` with the default configuration.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        Self::with_config(items, AdapterConfig::default())
    }

    /// Creates an adapter over `items`.
    pub fn with_config(items: impl IntoIterator<Item = T>, config: AdapterConfig) -> Self {
        let predicate: Arc<PredicateSlot<TextPredicate<T>>> = Arc::new(PredicateSlot::new(None));
        let mut adapter = Self::with_strategy(items, config, predicate.clone());
        adapter.predicate = predicate;
        adapter
    }

    /// Creates an adapter whose filter passes run `strategy` instead of the
    /// text predicate.
    pub(crate) fn with_strategy(
        items: impl IntoIterator<Item = T>,
        config: AdapterConfig,
        strategy: Arc<dyn FilterStrategy<Vec<Arc<T>>>>,
    ) -> Self {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        let store = Arc::new(SnapshotStore::new(items, &config));
        let filter = Filter::new(&store, strategy, config.executor.clone());
        Self {
            store,
            filter,
            predicate: Arc::new(PredicateSlot::new(None)),
            stable_ids: None,
        }
    }

    /// Sets the filter predicate.
    pub fn with_filter_predicate(self, predicate: TextPredicate<T>) -> Self {
        self.predicate.set(predicate);
        self
    }

    /// Declares stable identifiers derived from each item.
    pub fn with_stable_ids<F>(mut self, id_of: F) -> Self
    where
        F: Fn(&T) -> u64 + Send + Sync + 'static,
    {
        self.stable_ids = Some(Arc::new(id_of));
        self
    }

    /// Replaces the filter predicate. Takes effect on the next pass.
    pub fn set_filter_predicate(&self, predicate: TextPredicate<T>) {
        self.predicate.set(predicate);
    }

    /// The filter handle.
    pub fn filter(&self) -> &Filter<Vec<Arc<T>>> {
        &self.filter
    }

    /// The change signals.
    pub fn signals(&self) -> &AdapterSignals {
        self.store.signals()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of visible items.
    pub fn len(&self) -> usize {
        self.store.read(|s| s.visible().len())
    }

    /// Whether no items are visible.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The visible item at `position`.
    pub fn get(&self, position: usize) -> AdapterResult<Arc<T>> {
        self.store.read(|s| {
            let items = s.visible();
            check_index(position, items.len())?;
            Ok(items[position].clone())
        })
    }

    /// Identifier of the visible item at `position`.
    ///
    /// Without stable ids this is the position itself.
    pub fn item_id(&self, position: usize) -> AdapterResult<u64> {
        let item = self.get(position)?;
        Ok(match &self.stable_ids {
            Some(id_of) => id_of(&item),
            None => position as u64,
        })
    }

    /// Whether item ids survive reordering and filtering.
    pub fn has_stable_ids(&self) -> bool {
        self.stable_ids.is_some()
    }

    /// The visible items.
    pub fn visible_items(&self) -> Vec<Arc<T>> {
        self.store.read(|s| s.visible().clone())
    }

    /// Every item, ignoring the active filter.
    pub fn all_items(&self) -> Vec<Arc<T>> {
        self.store.read(|s| s.full().clone())
    }

    /// Whether a filter result is currently published.
    pub fn is_filtered(&self) -> bool {
        self.store.read(|s| s.is_filtered())
    }

    /// The constraint of the most recent non-blank filter request.
    pub fn current_constraint(&self) -> Option<String> {
        self.store.last_constraint()
    }

    /// Renders the visible item at `position`.
    pub fn render<R: ItemRenderer<T>>(&self, position: usize, renderer: &R) -> AdapterResult<R::View> {
        let item = self.get(position)?;
        Ok(renderer.render(position, &item))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Appends an item.
    pub fn add(&self, item: T) {
        let item = Arc::new(item);
        self.store.mutate(&self.filter, |s| {
            s.full_mut().push(item);
            (true, ())
        });
    }

    /// Appends several items. Returns `false` if `items` was empty.
    pub fn add_all(&self, items: impl IntoIterator<Item = T>) -> bool {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        self.store.mutate(&self.filter, |s| {
            let changed = !items.is_empty();
            s.full_mut().extend(items);
            (changed, changed)
        })
    }

    /// Inserts an item at `position` of the full collection.
    pub fn insert(&self, position: usize, item: T) -> AdapterResult<()> {
        self.insert_all(position, [item]).map(|_| ())
    }

    /// Inserts several items at `position` of the full collection.
    pub fn insert_all(&self, position: usize, items: impl IntoIterator<Item = T>) -> AdapterResult<bool> {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        self.store.try_mutate(&self.filter, |s| {
            let full = s.full_mut();
            if position > full.len() {
                return Err(AdapterError::IndexOutOfBounds {
                    index: position,
                    len: full.len(),
                });
            }
            let changed = !items.is_empty();
            let tail = full.split_off(position);
            full.extend(items);
            full.extend(tail);
            Ok((changed, changed))
        })
    }

    /// Removes the visible item at `position` and returns it.
    pub fn remove_at(&self, position: usize) -> AdapterResult<Arc<T>> {
        self.store.try_mutate(&self.filter, |s| {
            let index = full_position(s, position)?;
            Ok((true, s.full_mut().remove(index)))
        })
    }

    /// Replaces the visible item at `position`, returning the old item.
    pub fn update(&self, position: usize, item: T) -> AdapterResult<Arc<T>> {
        let item = Arc::new(item);
        self.store.try_mutate(&self.filter, |s| {
            let index = full_position(s, position)?;
            let old = std::mem::replace(&mut s.full_mut()[index], item);
            Ok((true, old))
        })
    }

    /// Removes every item.
    pub fn clear(&self) {
        self.store.mutate(&self.filter, |s| {
            let items = s.full_mut();
            let changed = !items.is_empty();
            items.clear();
            (changed, ())
        });
    }

    /// Replaces the whole collection.
    pub fn replace_all(&self, items: impl IntoIterator<Item = T>) {
        let items: Vec<Arc<T>> = items.into_iter().map(Arc::new).collect();
        self.store.mutate(&self.filter, |s| {
            *s.full_mut() = items;
            (true, ())
        });
    }

    /// Sorts the full collection with `compare`.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: Fn(&T, &T) -> Ordering,
    {
        self.store.mutate(&self.filter, |s| {
            s.full_mut().sort_by(|a, b| compare(&**a, &**b));
            (true, ())
        });
    }

    /// Sorts with a comparator chosen by inspecting the full collection.
    ///
    /// If `choose` fails the collection is left untouched.
    pub(crate) fn try_sort_with<F, C>(&self, choose: F) -> AdapterResult<()>
    where
        F: FnOnce(&[Arc<T>]) -> AdapterResult<C>,
        C: Fn(&T, &T) -> Ordering,
    {
        self.store.try_mutate(&self.filter, |s| {
            let items = s.full_mut();
            let compare = choose(items.as_slice())?;
            items.sort_by(|a, b| compare(&**a, &**b));
            Ok((!items.is_empty(), ()))
        })
    }

    // =========================================================================
    // Notification
    // =========================================================================

    /// Whether mutations emit `data_changed`.
    pub fn notify_on_change(&self) -> bool {
        self.store.notify_on_change()
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

impl<T: PartialEq + Send + Sync + 'static> ArrayAdapter<T> {
    /// Whether the full collection contains `item`.
    pub fn contains(&self, item: &T) -> bool {
        self.store.read(|s| s.full().iter().any(|i| **i == *item))
    }

    /// Whether the full collection contains every item of `items`.
    pub fn contains_all(&self, items: &[T]) -> bool {
        self.store
            .read(|s| items.iter().all(|wanted| s.full().iter().any(|i| **i == *wanted)))
    }

    /// Visible position of the first item equal to `item`.
    pub fn position_of(&self, item: &T) -> Option<usize> {
        self.store.read(|s| s.visible().iter().position(|i| **i == *item))
    }

    /// Removes the first item equal to `item`. Returns `false` if absent.
    pub fn remove(&self, item: &T) -> bool {
        self.store.mutate(&self.filter, |s| {
            let items = s.full_mut();
            match items.iter().position(|i| **i == *item) {
                Some(index) => {
                    items.remove(index);
                    (true, true)
                }
                None => (false, false),
            }
        })
    }

    /// Removes every item equal to any of `items`.
    pub fn remove_all(&self, items: &[T]) -> bool {
        self.store.mutate(&self.filter, |s| {
            let full = s.full_mut();
            let before = full.len();
            full.retain(|i| !items.contains(&**i));
            let changed = full.len() != before;
            (changed, changed)
        })
    }

    /// Keeps only items equal to one of `items`.
    pub fn retain_all(&self, items: &[T]) -> bool {
        self.store.mutate(&self.filter, |s| {
            let full = s.full_mut();
            let before = full.len();
            full.retain(|i| items.contains(&**i));
            let changed = full.len() != before;
            (changed, changed)
        })
    }
}

impl<T: Ord + Send + Sync + 'static> ArrayAdapter<T> {
    /// Sorts the full collection by natural order.
    pub fn sort(&self) {
        self.sort_by(T::cmp);
    }
}

impl<T: Send + Sync + 'static> Default for ArrayAdapter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ArrayAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (len, filtered) = self.store.read(|s| (s.visible().len(), s.is_filtered()));
        f.debug_struct("ArrayAdapter")
            .field("len", &len)
            .field("filtered", &filtered)
            .field("stable_ids", &self.has_stable_ids())
            .finish()
    }
}

static_assertions::assert_impl_all!(ArrayAdapter<String>: Send, Sync);
