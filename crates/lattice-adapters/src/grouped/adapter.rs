//! Grouped (parent/child) adapter.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use static_assertions::assert_impl_all;
use tracing::{trace, warn};

use lattice_adapters_core::logging::{TreeFormatter, TreeStyle, targets};

use super::builder::GroupedAdapterBuilder;
use super::data::{GroupComparator, GroupKey, GroupedData};
use super::key_cache::GroupKeyCache;
use crate::adapter::{AdapterSignals, Filter, FilterStrategy, GroupRenderer, Snapshot, SnapshotStore};
use crate::error::{AdapterError, AdapterResult};
use crate::selection::{ChoiceState, ExpandableSource, MultiChoiceListener};
use crate::surface::SurfaceBinding;

/// Derives the group key of a child.
pub type GroupFn<K, C> = Arc<dyn Fn(&C) -> K + Send + Sync>;

/// Group-level filter predicate.
pub type GroupPredicate<K> = Arc<dyn Fn(&K, &str) -> bool + Send + Sync>;

/// Child-level filter predicate.
pub type ChildPredicate<C> = Arc<dyn Fn(&C, &str) -> bool + Send + Sync>;

/// Stable id of a group, derived from its key.
pub type GroupIdFn<K> = Arc<dyn Fn(&K) -> u64 + Send + Sync>;

/// Stable id of a child, unique within its group.
pub type ChildIdFn<C> = Arc<dyn Fn(&C) -> u64 + Send + Sync>;

pub(crate) struct StableIds<K, C> {
    pub(crate) group: GroupIdFn<K>,
    pub(crate) child: ChildIdFn<C>,
}

/// Group and child predicates of a two-level filter pass.
///
/// A level without a predicate passes everything.
pub(crate) struct GroupPredicates<K, C> {
    group: RwLock<Option<GroupPredicate<K>>>,
    child: RwLock<Option<ChildPredicate<C>>>,
}

impl<K, C> GroupPredicates<K, C> {
    pub(crate) fn new(group: Option<GroupPredicate<K>>, child: Option<ChildPredicate<C>>) -> Self {
        Self {
            group: RwLock::new(group),
            child: RwLock::new(child),
        }
    }
}

impl<K: GroupKey, C: Send + Sync + 'static> FilterStrategy<GroupedData<K, C>> for GroupPredicates<K, C> {
    fn perform(&self, source: GroupedData<K, C>, constraint: &str) -> GroupedData<K, C> {
        let group = self.group.read().clone();
        let child = self.child.read().clone();
        if group.is_none() && child.is_none() {
            warn!(target: targets::FILTER, constraint, "no group or child predicate registered, keeping all groups");
            return source;
        }
        source.filtered(
            |key| group.as_ref().is_none_or(|keep| keep(key, constraint)),
            |item| child.as_ref().is_none_or(|keep| keep(item, constraint)),
        )
    }
}

/// Looks up the key of `child`, consulting the cache first.
pub(crate) fn derive_key<K: Clone, C>(group_of: &GroupFn<K, C>, cache: &dyn GroupKeyCache<K, C>, child: &Arc<C>) -> K {
    cache.get(child).unwrap_or_else(|| group_of(child))
}

/// Maps a visible (group, child) position to the child's key and its index in
/// the full collection's bucket.
fn resolve_child<K: GroupKey, C: Send + Sync + 'static>(
    snapshot: &Snapshot<GroupedData<K, C>>,
    group: usize,
    child: usize,
) -> AdapterResult<(K, usize)> {
    let visible = snapshot.visible();
    let key = visible.key_at(group).ok_or(AdapterError::GroupOutOfBounds {
        group,
        len: visible.group_count(),
    })?;
    let children = visible.children_of(key).unwrap_or_default();
    let target = children.get(child).ok_or(AdapterError::ChildOutOfBounds {
        group,
        child,
        len: children.len(),
    })?;
    match snapshot {
        Snapshot::Unfiltered(_) => Ok((key.clone(), child)),
        Snapshot::Filtered { full, .. } => full
            .children_of(key)
            .and_then(|bucket| bucket.iter().position(|c| Arc::ptr_eq(c, target)))
            .map(|index| (key.clone(), index))
            .ok_or(AdapterError::StaleItem { index: child }),
    }
}

fn check_group<K: GroupKey, C>(data: &GroupedData<K, C>, group: usize) -> AdapterResult<&K> {
    data.key_at(group).ok_or(AdapterError::GroupOutOfBounds {
        group,
        len: data.group_count(),
    })
}

fn check_child<K: GroupKey, C>(data: &GroupedData<K, C>, group: usize, child: usize) -> AdapterResult<&Arc<C>> {
    let key = check_group(data, group)?;
    let children = data.children_of(key).unwrap_or_default();
    children.get(child).ok_or(AdapterError::ChildOutOfBounds {
        group,
        child,
        len: children.len(),
    })
}

/// Selection's view of the visible groups.
pub(crate) struct GroupedView<'a, K, C> {
    data: &'a GroupedData<K, C>,
    ids: Option<&'a StableIds<K, C>>,
}

impl<'a, K, C> GroupedView<'a, K, C> {
    pub(crate) fn new(data: &'a GroupedData<K, C>, ids: Option<&'a StableIds<K, C>>) -> Self {
        Self { data, ids }
    }
}

impl<K: GroupKey, C> ExpandableSource for GroupedView<'_, K, C> {
    fn group_count(&self) -> usize {
        self.data.group_count()
    }

    fn child_count(&self, group: usize) -> usize {
        self.data.child_count(group).unwrap_or(0)
    }

    fn group_id(&self, group: usize) -> u64 {
        match (self.ids, self.data.key_at(group)) {
            (Some(ids), Some(key)) => (ids.group)(key),
            _ => group as u64,
        }
    }

    fn child_id(&self, group: usize, child: usize) -> u64 {
        match (self.ids, self.data.child_at(group, child)) {
            (Some(ids), Some(item)) => (ids.child)(item),
            _ => child as u64,
        }
    }

    fn has_stable_ids(&self) -> bool {
        self.ids.is_some()
    }
}

/// Packs a group id the way expandable list views expect.
pub fn combine_group_id(group_id: u64) -> u64 {
    (group_id & 0x7FFF_FFFF) << 32
}

/// Packs a child id together with its group id. Never collides with a
/// combined group id.
pub fn combine_child_id(group_id: u64, child_id: u64) -> u64 {
    0x8000_0000_0000_0000 | ((group_id & 0x7FFF_FFFF) << 32) | (child_id & 0xFFFF_FFFF)
}

/// A thread-safe adapter that buckets children into groups.
///
/// Children are grouped by a caller-supplied key function. Groups are
/// ordered by key (or a custom comparator) or by creation order, and a group
/// exists only while it has at least one child. Filtering runs in two levels:
/// a group predicate decides whole groups, a child predicate prunes the
/// children of the groups that pass.
///
/// Positions always refer to the visible groups. Selection and the modal
/// action lifecycle live in the `choice` half of this type.
///
/// # Example
///
/// ```
/// use lattice_adapters::adapter::{AdapterConfig, GroupedAdapterConfig};
/// use lattice_adapters::grouped::GroupedAdapter;
///
/// let adapter = GroupedAdapter::builder(|word: &String| word.len())
///     .children(["ox", "cat", "be", "dog"].map(String::from))
///     .config(GroupedAdapterConfig::default().with_base(AdapterConfig::inline()))
///     .build();
///
/// assert_eq!(adapter.groups(), vec![2, 3]);
/// assert_eq!(adapter.child_count(0).unwrap(), 2);
/// ```
pub struct GroupedAdapter<K, C> {
    pub(super) store: Arc<SnapshotStore<GroupedData<K, C>>>,
    pub(super) filter: Filter<GroupedData<K, C>>,
    pub(super) predicates: Arc<GroupPredicates<K, C>>,
    pub(super) group_of: GroupFn<K, C>,
    pub(super) key_cache: Arc<dyn GroupKeyCache<K, C>>,
    pub(super) ids: Option<StableIds<K, C>>,
    pub(super) selection: Mutex<ChoiceState>,
    pub(super) listener: RwLock<Option<Arc<dyn MultiChoiceListener>>>,
    pub(super) surface: Mutex<SurfaceBinding>,
}

assert_impl_all!(GroupedAdapter<u32, String>: Send, Sync);

impl<K: GroupKey, C: Send + Sync + 'static> GroupedAdapter<K, C> {
    /// Creates an adapter over `children` with the default configuration.
    pub fn new<F>(children: impl IntoIterator<Item = C>, group_of: F) -> Self
    where
        F: Fn(&C) -> K + Send + Sync + 'static,
    {
        Self::builder(group_of).children(children).build()
    }

    /// Starts a builder.
    pub fn builder<F>(group_of: F) -> GroupedAdapterBuilder<K, C>
    where
        F: Fn(&C) -> K + Send + Sync + 'static,
    {
        GroupedAdapterBuilder::new(group_of)
    }

    /// The filter handle.
    pub fn filter(&self) -> &Filter<GroupedData<K, C>> {
        &self.filter
    }

    /// The change signals.
    pub fn signals(&self) -> &AdapterSignals {
        self.store.signals()
    }

    /// Replaces the group-level predicate. Takes effect on the next pass.
    pub fn set_group_predicate<F>(&self, predicate: F)
    where
        F: Fn(&K, &str) -> bool + Send + Sync + 'static,
    {
        *self.predicates.group.write() = Some(Arc::new(predicate));
    }

    /// Replaces the child-level predicate. Takes effect on the next pass.
    pub fn set_child_predicate<F>(&self, predicate: F)
    where
        F: Fn(&C, &str) -> bool + Send + Sync + 'static,
    {
        *self.predicates.child.write() = Some(Arc::new(predicate));
    }

    fn key_of(&self, child: &Arc<C>) -> K {
        derive_key(&self.group_of, self.key_cache.as_ref(), child)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of visible groups.
    pub fn group_count(&self) -> usize {
        self.store.read(|s| s.visible().group_count())
    }

    /// Number of visible children in `group`.
    pub fn child_count(&self, group: usize) -> AdapterResult<usize> {
        self.store.read(|s| {
            let data = s.visible();
            check_group(data, group)?;
            Ok(data.child_count(group).unwrap_or(0))
        })
    }

    /// Key of the visible group at `group`.
    pub fn group(&self, group: usize) -> AdapterResult<K> {
        self.store.read(|s| check_group(s.visible(), group).cloned())
    }

    /// Visible child at (`group`, `child`).
    pub fn child(&self, group: usize, child: usize) -> AdapterResult<Arc<C>> {
        self.store.read(|s| check_child(s.visible(), group, child).cloned())
    }

    /// Visible children of `group`.
    pub fn children_of(&self, group: usize) -> AdapterResult<Vec<Arc<C>>> {
        self.store.read(|s| {
            let data = s.visible();
            let key = check_group(data, group)?;
            Ok(data.children_of(key).map(<[Arc<C>]>::to_vec).unwrap_or_default())
        })
    }

    /// Keys of the visible groups, in index order.
    pub fn groups(&self) -> Vec<K> {
        self.store.read(|s| s.visible().iter().map(|(key, _)| key.clone()).collect())
    }

    /// Visible position of the group with `key`.
    pub fn position_of_group(&self, key: &K) -> Option<usize> {
        self.store.read(|s| s.visible().position_of(key))
    }

    /// Id of the visible group at `group`.
    ///
    /// Without stable ids this is the group position.
    pub fn group_id(&self, group: usize) -> AdapterResult<u64> {
        self.store.read(|s| {
            let data = s.visible();
            check_group(data, group)?;
            Ok(GroupedView::new(data, self.ids.as_ref()).group_id(group))
        })
    }

    /// Id of a visible child. Without stable ids this is the child position.
    pub fn child_id(&self, group: usize, child: usize) -> AdapterResult<u64> {
        self.store.read(|s| {
            let data = s.visible();
            check_child(data, group, child)?;
            Ok(GroupedView::new(data, self.ids.as_ref()).child_id(group, child))
        })
    }

    /// [`group_id`](Self::group_id) packed with [`combine_group_id`].
    pub fn combined_group_id(&self, group: usize) -> AdapterResult<u64> {
        self.group_id(group).map(combine_group_id)
    }

    /// [`child_id`](Self::child_id) packed with [`combine_child_id`].
    pub fn combined_child_id(&self, group: usize, child: usize) -> AdapterResult<u64> {
        let group_id = self.group_id(group)?;
        let child_id = self.child_id(group, child)?;
        Ok(combine_child_id(group_id, child_id))
    }

    /// Whether ids survive reordering and filtering.
    pub fn has_stable_ids(&self) -> bool {
        self.ids.is_some()
    }

    /// Every child, ignoring the active filter, group by group.
    pub fn get_list(&self) -> Vec<Arc<C>> {
        self.store.read(|s| s.full().flatten())
    }

    /// The visible children, group by group.
    pub fn visible_list(&self) -> Vec<Arc<C>> {
        self.store.read(|s| s.visible().flatten())
    }

    /// Whether a filter result is currently published.
    pub fn is_filtered(&self) -> bool {
        self.store.read(|s| s.is_filtered())
    }

    /// The constraint of the most recent non-blank filter request.
    pub fn current_constraint(&self) -> Option<String> {
        self.store.last_constraint()
    }

    /// Whether the group index is sorted (otherwise creation order).
    pub fn groups_sorted(&self) -> bool {
        self.store.read(|s| s.full().is_sorted())
    }

    /// Renders the header of the visible group at `group`.
    pub fn render_group<R: GroupRenderer<K, C>>(&self, group: usize, renderer: &R) -> AdapterResult<R::View> {
        let (key, count) = self.store.read(|s| {
            let data = s.visible();
            let key = check_group(data, group)?.clone();
            Ok::<_, AdapterError>((key, data.child_count(group).unwrap_or(0)))
        })?;
        Ok(renderer.render_group(group, &key, count))
    }

    /// Renders the visible child at (`group`, `child`).
    pub fn render_child<R: GroupRenderer<K, C>>(
        &self,
        group: usize,
        child: usize,
        renderer: &R,
    ) -> AdapterResult<R::View> {
        let (item, is_last) = self.store.read(|s| {
            let data = s.visible();
            let item = check_child(data, group, child)?.clone();
            Ok::<_, AdapterError>((item, data.child_count(group) == Some(child + 1)))
        })?;
        Ok(renderer.render_child(group, child, &item, is_last))
    }

    /// Dumps the visible groups and children as a tree.
    pub fn debug_tree(&self, style: TreeStyle) -> String
    where
        K: fmt::Display,
        C: fmt::Display,
    {
        self.store.read(|s| {
            let mut tree = TreeFormatter::new(style);
            for (key, children) in s.visible().iter() {
                tree.node(key, children.iter().map(|child| child.to_string()));
            }
            tree.finish()
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a child to the group its key selects, creating the group if needed.
    pub fn add(&self, child: C) {
        let child = Arc::new(child);
        let key = self.key_of(&child);
        self.key_cache.put(&child, &key);
        self.store.mutate(&self.filter, |s| {
            if s.full_mut().push(key.clone(), child) {
                trace!(target: targets::GROUPING, ?key, "group created");
            }
            (true, ())
        });
    }

    /// Adds several children. Returns `false` if `children` was empty.
    pub fn add_all(&self, children: impl IntoIterator<Item = C>) -> bool {
        let keyed: Vec<(K, Arc<C>)> = children
            .into_iter()
            .map(|child| {
                let child = Arc::new(child);
                let key = self.key_of(&child);
                self.key_cache.put(&child, &key);
                (key, child)
            })
            .collect();
        self.store.mutate(&self.filter, |s| {
            let changed = !keyed.is_empty();
            let data = s.full_mut();
            for (key, child) in keyed {
                data.push(key, child);
            }
            (changed, changed)
        })
    }

    /// Removes the visible child at (`group`, `child`) and returns it.
    ///
    /// A group left without children disappears.
    pub fn remove_at(&self, group: usize, child: usize) -> AdapterResult<Arc<C>> {
        let removed = self.store.try_mutate(&self.filter, |s| {
            let (key, index) = resolve_child(s, group, child)?;
            let removed = s
                .full_mut()
                .remove_child(&key, index)
                .ok_or(AdapterError::StaleItem { index: child })?;
            Ok((true, removed))
        })?;
        self.key_cache.evict(&removed);
        Ok(removed)
    }

    /// Removes `item` by identity. Returns `false` if it is not held.
    pub fn remove_item(&self, item: &Arc<C>) -> bool {
        let hint = self.key_of(item);
        let removed = self.store.mutate(&self.filter, |s| {
            let removed = s
                .full_mut()
                .remove_matching(Some(&hint), |c| std::ptr::eq(c, Arc::as_ptr(item)));
            (removed.is_some(), removed)
        });
        match removed {
            Some((_, child)) => {
                self.key_cache.evict(&child);
                true
            }
            None => false,
        }
    }

    /// Replaces the visible child at (`group`, `child`).
    ///
    /// If the new value derives a different key the child moves to that
    /// group, which is created if needed; the old group disappears if it
    /// empties.
    pub fn update(&self, group: usize, child: usize, value: C) -> AdapterResult<Arc<C>> {
        let value = Arc::new(value);
        let new_key = self.key_of(&value);
        let cached = value.clone();
        let old = self.store.try_mutate(&self.filter, |s| {
            let (key, index) = resolve_child(s, group, child)?;
            let data = s.full_mut();
            let old = if key == new_key {
                data.replace_child(&key, index, value)
            } else {
                trace!(target: targets::GROUPING, from = ?key, to = ?new_key, "child moved between groups");
                let old = data.remove_child(&key, index);
                data.push(new_key.clone(), value);
                old
            };
            let old = old.ok_or(AdapterError::StaleItem { index: child })?;
            Ok((true, old))
        })?;
        self.key_cache.evict(&old);
        self.key_cache.put(&cached, &new_key);
        Ok(old)
    }

    /// Removes every child.
    pub fn clear(&self) {
        self.store.mutate(&self.filter, |s| {
            let data = s.full_mut();
            let changed = !data.is_empty();
            data.clear();
            (changed, ())
        });
        self.key_cache.clear();
    }

    /// Replaces every child.
    pub fn replace_all(&self, children: impl IntoIterator<Item = C>) {
        self.key_cache.clear();
        let keyed: Vec<(K, Arc<C>)> = children
            .into_iter()
            .map(|child| {
                let child = Arc::new(child);
                let key = (self.group_of)(&child);
                self.key_cache.put(&child, &key);
                (key, child)
            })
            .collect();
        self.store.mutate(&self.filter, |s| {
            let data = s.full_mut();
            let mut fresh = data.empty_like();
            for (key, child) in keyed {
                fresh.push(key, child);
            }
            *data = fresh;
            (true, ())
        });
    }

    /// Sorts the children within every group.
    pub fn sort_children_by<F>(&self, compare: F)
    where
        F: Fn(&C, &C) -> Ordering,
    {
        self.store.mutate(&self.filter, |s| {
            s.full_mut().sort_children(&compare);
            (true, ())
        });
    }

    /// Switches between sorted and creation-ordered groups.
    pub fn set_groups_sorted(&self, sorted: bool) {
        self.store.mutate(&self.filter, |s| {
            let changed = s.full().is_sorted() != sorted;
            if changed {
                s.apply_to_all(|data| data.set_sorted(sorted));
            }
            (changed, ())
        });
    }

    /// Orders groups with `compare` while sorted. Natural key order otherwise.
    pub fn set_group_comparator<F>(&self, compare: F)
    where
        F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        let compare: GroupComparator<K> = Arc::new(compare);
        self.store.mutate(&self.filter, |s| {
            s.apply_to_all(|data| data.set_comparator(Some(compare.clone())));
            (true, ())
        });
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

impl<K: GroupKey, C: PartialEq + Send + Sync + 'static> GroupedAdapter<K, C> {
    /// Whether any child, filtered out or not, equals `item`.
    pub fn contains(&self, item: &C) -> bool {
        let key = (self.group_of)(item);
        self.store.read(|s| {
            let data = s.full();
            let in_bucket = |children: &[Arc<C>]| children.iter().any(|c| **c == *item);
            data.children_of(&key).is_some_and(|children| in_bucket(children))
                || data.iter().any(|(_, children)| in_bucket(children))
        })
    }

    /// Whether every one of `items` is held.
    pub fn contains_all(&self, items: &[C]) -> bool {
        items.iter().all(|item| self.contains(item))
    }

    /// Removes the first child equal to `item`. Returns `false` if absent.
    ///
    /// The group `item` derives is searched first; the other groups only if
    /// the child is not found there.
    pub fn remove(&self, item: &C) -> bool {
        let hint = (self.group_of)(item);
        let removed = self.store.mutate(&self.filter, |s| {
            let removed = s.full_mut().remove_matching(Some(&hint), |c| c == item);
            (removed.is_some(), removed)
        });
        match removed {
            Some((_, child)) => {
                self.key_cache.evict(&child);
                true
            }
            None => false,
        }
    }

    /// Removes one child equal to each of `items`.
    pub fn remove_all(&self, items: &[C]) -> bool {
        let hints: Vec<K> = items.iter().map(|item| (self.group_of)(item)).collect();
        let removed = self.store.mutate(&self.filter, |s| {
            let data = s.full_mut();
            let removed: Vec<Arc<C>> = items
                .iter()
                .zip(&hints)
                .filter_map(|(item, hint)| data.remove_matching(Some(hint), |c| c == item))
                .map(|(_, child)| child)
                .collect();
            (!removed.is_empty(), removed)
        });
        for child in &removed {
            self.key_cache.evict(child);
        }
        !removed.is_empty()
    }

    /// Keeps only children equal to one of `items`.
    pub fn retain_all(&self, items: &[C]) -> bool {
        let removed = self.store.mutate(&self.filter, |s| {
            let removed = s.full_mut().retain(|_, child| items.contains(child));
            (!removed.is_empty(), removed)
        });
        for child in &removed {
            self.key_cache.evict(child);
        }
        !removed.is_empty()
    }
}

impl<K: GroupKey, C: Ord + Send + Sync + 'static> GroupedAdapter<K, C> {
    /// Sorts the children within every group by natural order.
    pub fn sort_children(&self) {
        self.sort_children_by(C::cmp);
    }
}

impl<K, C> fmt::Debug for GroupedAdapter<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupedAdapter")
            .field("filter", &self.filter)
            .field("stable_ids", &self.ids.is_some())
            .field("selection", &*self.selection.lock())
            .field("surface", &*self.surface.lock())
            .finish_non_exhaustive()
    }
}
