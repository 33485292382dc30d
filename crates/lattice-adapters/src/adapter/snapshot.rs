//! Snapshot store: the full collection, the visible collection, and the lock
//! that guards both.
//!
//! While no filter is active the adapter holds a single collection that is both
//! full and visible. The first non-blank filter request materializes a copy, after
//! which mutations go to the full collection and the visible one is only ever
//! replaced wholesale by a published filter result.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use lattice_adapters_core::logging::targets;

use super::config::{AdapterConfig, FilterOrdering};
use super::filter::Filter;
use super::signals::AdapterSignals;
use crate::error::AdapterResult;

/// A collection an adapter can hold and filter.
///
/// Clones must be cheap relative to a filter pass; adapters store items behind
/// `Arc` so cloning copies pointers, not items.
pub trait ItemCollection: Clone + Default + Send + Sync + 'static {
    /// Number of top-level entries (items, or groups for grouped data).
    fn item_count(&self) -> usize;
}

impl<T: Clone + Send + Sync + 'static> ItemCollection for Vec<T> {
    fn item_count(&self) -> usize {
        self.len()
    }
}

/// Filter state of an adapter's data.
#[derive(Debug, Clone)]
pub enum Snapshot<C> {
    /// No filter active: one collection serves as both full and visible.
    Unfiltered(C),
    /// A filter is active: `full` receives mutations, `visible` holds the
    /// last published result.
    Filtered { visible: C, full: C },
}

impl<C: Default> Default for Snapshot<C> {
    fn default() -> Self {
        Snapshot::Unfiltered(C::default())
    }
}

impl<C: ItemCollection> Snapshot<C> {
    /// The collection reads and positions refer to.
    pub fn visible(&self) -> &C {
        match self {
            Snapshot::Unfiltered(items) => items,
            Snapshot::Filtered { visible, .. } => visible,
        }
    }

    /// The collection of record.
    pub fn full(&self) -> &C {
        match self {
            Snapshot::Unfiltered(items) => items,
            Snapshot::Filtered { full, .. } => full,
        }
    }

    /// The collection mutations apply to.
    pub fn full_mut(&mut self) -> &mut C {
        match self {
            Snapshot::Unfiltered(items) => items,
            Snapshot::Filtered { full, .. } => full,
        }
    }

    /// Whether a filter result is currently published.
    pub fn is_filtered(&self) -> bool {
        matches!(self, Snapshot::Filtered { .. })
    }

    /// Applies `f` to every collection held, visible and full alike.
    ///
    /// Only for presentation settings (such as ordering) that a filter pass
    /// would carry over anyway; content changes go through [`full_mut`](Self::full_mut).
    pub(crate) fn apply_to_all(&mut self, mut f: impl FnMut(&mut C)) {
        match self {
            Snapshot::Unfiltered(items) => f(items),
            Snapshot::Filtered { visible, full } => {
                f(visible);
                f(full);
            }
        }
    }

    /// Materializes the snapshot if needed and returns a copy of the full
    /// collection for a filter pass to work on.
    pub(crate) fn begin_filter(&mut self) -> C {
        if let Snapshot::Unfiltered(items) = self {
            let full = std::mem::take(items);
            *self = Snapshot::Filtered {
                visible: full.clone(),
                full,
            };
        }
        self.full().clone()
    }

    /// Installs a filter result as the visible collection.
    ///
    /// Publishing onto an unfiltered snapshot re-enters the filtered state; this
    /// is what lets a slow, stale pass overwrite a reset under
    /// [`FilterOrdering::PublishAll`].
    pub(crate) fn publish(&mut self, result: C) {
        match self {
            Snapshot::Unfiltered(items) => {
                let full = std::mem::take(items);
                *self = Snapshot::Filtered {
                    visible: result,
                    full,
                };
            }
            Snapshot::Filtered { visible, .. } => *visible = result,
        }
    }

    /// Discards the filtered copy. Returns the resulting visible count.
    pub(crate) fn reset(&mut self) -> usize {
        if let Snapshot::Filtered { full, .. } = self {
            let full = std::mem::take(full);
            *self = Snapshot::Unfiltered(full);
        }
        self.visible().item_count()
    }
}

struct StoreState<C> {
    snapshot: Snapshot<C>,
    last_constraint: Option<String>,
}

/// Outcome of the locked first phase of a filter pass.
pub(crate) enum Acquired<C> {
    /// Blank constraint: the snapshot was dropped, nothing to compute.
    Reset { count: usize },
    /// A copy of the full collection to filter off the lock.
    Source { source: C, generation: u64 },
}

/// Lock-guarded adapter data plus the change signals and notify flag.
pub(crate) struct SnapshotStore<C> {
    state: Mutex<StoreState<C>>,
    notify_on_change: AtomicBool,
    generation: AtomicU64,
    ordering: FilterOrdering,
    signals: AdapterSignals,
}

impl<C: ItemCollection> SnapshotStore<C> {
    pub(crate) fn new(items: C, config: &AdapterConfig) -> Self {
        Self {
            state: Mutex::new(StoreState {
                snapshot: Snapshot::Unfiltered(items),
                last_constraint: None,
            }),
            notify_on_change: AtomicBool::new(config.notify_on_change),
            generation: AtomicU64::new(0),
            ordering: config.filter_ordering,
            signals: AdapterSignals::new(),
        }
    }

    pub(crate) fn signals(&self) -> &AdapterSignals {
        &self.signals
    }

    /// Runs `f` with the snapshot locked.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Snapshot<C>) -> R) -> R {
        let state = self.state.lock();
        f(&state.snapshot)
    }

    pub(crate) fn last_constraint(&self) -> Option<String> {
        self.state.lock().last_constraint.clone()
    }

    /// Applies an infallible mutation. `f` reports whether anything changed.
    pub(crate) fn mutate<R>(
        &self,
        filter: &Filter<C>,
        f: impl FnOnce(&mut Snapshot<C>) -> (bool, R),
    ) -> R {
        let (changed, replay, result) = {
            let mut state = self.state.lock();
            let (changed, result) = f(&mut state.snapshot);
            (changed, Self::replay_for(&state, changed), result)
        };
        self.finish_mutation(filter, changed, replay);
        result
    }

    /// Applies a mutation that may fail before touching the data.
    pub(crate) fn try_mutate<R>(
        &self,
        filter: &Filter<C>,
        f: impl FnOnce(&mut Snapshot<C>) -> AdapterResult<(bool, R)>,
    ) -> AdapterResult<R> {
        let (changed, replay, result) = {
            let mut state = self.state.lock();
            let (changed, result) = f(&mut state.snapshot)?;
            (changed, Self::replay_for(&state, changed), result)
        };
        self.finish_mutation(filter, changed, replay);
        Ok(result)
    }

    fn replay_for(state: &StoreState<C>, changed: bool) -> Option<String> {
        if changed && state.snapshot.is_filtered() {
            Some(state.last_constraint.clone().unwrap_or_default())
        } else {
            None
        }
    }

    // Runs with the lock released: replaying takes the lock again and signal
    // slots are free to read the adapter.
    fn finish_mutation(&self, filter: &Filter<C>, changed: bool, replay: Option<String>) {
        if !changed {
            return;
        }
        if let Some(constraint) = replay {
            trace!(target: targets::SNAPSHOT, %constraint, "replaying filter after mutation");
            filter.filter(&constraint);
        }
        if self.notify_on_change.load(Ordering::Acquire) {
            self.signals.data_changed.emit(());
        }
    }

    pub(crate) fn notify_on_change(&self) -> bool {
        self.notify_on_change.load(Ordering::Acquire)
    }

    /// Sets the notify flag. Re-enabling it counts as a change.
    pub(crate) fn set_notify_on_change(&self, enabled: bool) {
        let previous = self.notify_on_change.swap(enabled, Ordering::AcqRel);
        if enabled && !previous {
            self.signals.data_changed.emit(());
        }
    }

    /// Emits `data_changed` and re-enables automatic notification.
    pub(crate) fn notify_data_set_changed(&self) {
        self.notify_on_change.store(true, Ordering::Release);
        self.signals.data_changed.emit(());
    }

    /// First, locked phase of a filter pass.
    pub(crate) fn acquire(&self, constraint: &str) -> Acquired<C> {
        let mut state = self.state.lock();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        if constraint.trim().is_empty() {
            state.last_constraint = None;
            let count = state.snapshot.reset();
            debug!(target: targets::SNAPSHOT, count, "filter cleared");
            Acquired::Reset { count }
        } else {
            state.last_constraint = Some(constraint.to_owned());
            Acquired::Source {
                source: state.snapshot.begin_filter(),
                generation,
            }
        }
    }

    /// Final, locked phase of a filter pass. Returns `false` when the result
    /// was superseded and dropped.
    pub(crate) fn publish(&self, result: C, generation: u64) -> bool {
        let mut state = self.state.lock();
        if self.ordering == FilterOrdering::LatestOnly
            && generation != self.generation.load(Ordering::Acquire)
        {
            return false;
        }
        state.snapshot.publish(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_filter_materializes_copy() {
        let mut snapshot = Snapshot::Unfiltered(vec![1, 2, 3]);
        assert!(!snapshot.is_filtered());

        let source = snapshot.begin_filter();
        assert_eq!(source, vec![1, 2, 3]);
        assert!(snapshot.is_filtered());
        assert_eq!(snapshot.visible(), &vec![1, 2, 3]);

        snapshot.full_mut().push(4);
        assert_eq!(snapshot.full().len(), 4);
        assert_eq!(snapshot.visible().len(), 3);
    }

    #[test]
    fn test_publish_and_reset() {
        let mut snapshot = Snapshot::Unfiltered(vec![1, 2, 3]);
        snapshot.begin_filter();
        snapshot.publish(vec![2]);
        assert_eq!(snapshot.visible(), &vec![2]);
        assert_eq!(snapshot.full(), &vec![1, 2, 3]);

        assert_eq!(snapshot.reset(), 3);
        assert!(!snapshot.is_filtered());
        assert_eq!(snapshot.visible(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_publish_onto_unfiltered_reenters_filtered() {
        let mut snapshot = Snapshot::Unfiltered(vec![1, 2, 3]);
        snapshot.publish(vec![1]);
        assert!(snapshot.is_filtered());
        assert_eq!(snapshot.visible(), &vec![1]);
        assert_eq!(snapshot.full(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_latest_only_drops_stale_generation() {
        let config = AdapterConfig::inline().with_filter_ordering(FilterOrdering::LatestOnly);
        let store = SnapshotStore::new(vec![1, 2, 3], &config);

        let Acquired::Source { generation: first, .. } = store.acquire("a") else {
            panic!("expected a source");
        };
        let Acquired::Source { generation: second, .. } = store.acquire("b") else {
            panic!("expected a source");
        };

        assert!(store.publish(vec![3], second));
        assert!(!store.publish(vec![1, 2], first));
        assert_eq!(store.read(|s| s.visible().clone()), vec![3]);
    }

    #[test]
    fn test_publish_all_keeps_completion_order() {
        let store = SnapshotStore::new(vec![1, 2, 3], &AdapterConfig::inline());

        let Acquired::Source { generation: first, .. } = store.acquire("a") else {
            panic!("expected a source");
        };
        let Acquired::Source { generation: second, .. } = store.acquire("b") else {
            panic!("expected a source");
        };

        assert!(store.publish(vec![3], second));
        assert!(store.publish(vec![1, 2], first));
        assert_eq!(store.read(|s| s.visible().clone()), vec![1, 2]);
    }

    #[test]
    fn test_blank_constraint_resets() {
        let store = SnapshotStore::new(vec![1, 2, 3], &AdapterConfig::inline());
        store.acquire("x");
        assert!(store.read(|s| s.is_filtered()));

        match store.acquire("   ") {
            Acquired::Reset { count } => assert_eq!(count, 3),
            Acquired::Source { .. } => panic!("blank constraint must reset"),
        }
        assert!(!store.read(|s| s.is_filtered()));
        assert_eq!(store.last_constraint(), None);
    }
}
