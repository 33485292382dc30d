//! Group key to children map plus the ordered group index.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::adapter::ItemCollection;

/// Requirements on a group key.
pub trait GroupKey: Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static {}

impl<T> GroupKey for T where T: Clone + Eq + Hash + Ord + fmt::Debug + Send + Sync + 'static {}

/// Custom group ordering.
pub type GroupComparator<K> = Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>;

/// Children bucketed by group key, with an ordered index over the keys.
///
/// Every key maps to at least one child: removing the last child of a group
/// removes the group. The index is either sorted (natural order or a custom
/// comparator) or follows the order in which groups were first created.
pub struct GroupedData<K, C> {
    buckets: HashMap<K, Vec<Arc<C>>>,
    insertion: Vec<K>,
    index: Vec<K>,
    sorted: bool,
    comparator: Option<GroupComparator<K>>,
}

impl<K: Clone, C> Clone for GroupedData<K, C> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            insertion: self.insertion.clone(),
            index: self.index.clone(),
            sorted: self.sorted,
            comparator: self.comparator.clone(),
        }
    }
}

impl<K: GroupKey, C> Default for GroupedData<K, C> {
    fn default() -> Self {
        Self::new(true, None)
    }
}

impl<K: GroupKey, C> GroupedData<K, C> {
    /// Creates empty grouped data.
    pub fn new(sorted: bool, comparator: Option<GroupComparator<K>>) -> Self {
        Self {
            buckets: HashMap::new(),
            insertion: Vec::new(),
            index: Vec::new(),
            sorted,
            comparator,
        }
    }

    /// Empty data with the same ordering settings.
    pub(crate) fn empty_like(&self) -> Self {
        Self::new(self.sorted, self.comparator.clone())
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.index.len()
    }

    /// Total number of children across all groups.
    pub fn child_total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Key of the group at `group`.
    pub fn key_at(&self, group: usize) -> Option<&K> {
        self.index.get(group)
    }

    /// Position of the group with `key`.
    pub fn position_of(&self, key: &K) -> Option<usize> {
        self.index.iter().position(|k| k == key)
    }

    /// Children of the group at `group`.
    pub fn children_at(&self, group: usize) -> Option<&[Arc<C>]> {
        self.key_at(group).and_then(|key| self.children_of(key))
    }

    /// Children of the group with `key`.
    pub fn children_of(&self, key: &K) -> Option<&[Arc<C>]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Number of children in the group at `group`.
    pub fn child_count(&self, group: usize) -> Option<usize> {
        self.children_at(group).map(<[Arc<C>]>::len)
    }

    /// Child at (`group`, `child`).
    pub fn child_at(&self, group: usize, child: usize) -> Option<&Arc<C>> {
        self.children_at(group).and_then(|children| children.get(child))
    }

    /// Groups in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[Arc<C>])> {
        self.index
            .iter()
            .filter_map(|key| self.buckets.get(key).map(|children| (key, children.as_slice())))
    }

    /// Every child, group by group in index order.
    pub fn flatten(&self) -> Vec<Arc<C>> {
        self.iter().flat_map(|(_, children)| children.iter().cloned()).collect()
    }

    /// Finds `child` by identity. Returns its key and position in the group.
    pub fn locate(&self, child: &Arc<C>) -> Option<(K, usize)> {
        self.iter().find_map(|(key, children)| {
            children
                .iter()
                .position(|c| Arc::ptr_eq(c, child))
                .map(|i| (key.clone(), i))
        })
    }

    /// Whether the index is kept sorted.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Appends `child` to the group `key`. Returns `true` if the group is new.
    pub fn push(&mut self, key: K, child: Arc<C>) -> bool {
        match self.buckets.get_mut(&key) {
            Some(children) => {
                children.push(child);
                false
            }
            None => {
                self.buckets.insert(key.clone(), vec![child]);
                self.insertion.push(key);
                self.rebuild_index();
                true
            }
        }
    }

    /// Removes the child at `child` of group `key`, dropping the group if it empties.
    pub fn remove_child(&mut self, key: &K, child: usize) -> Option<Arc<C>> {
        let children = self.buckets.get_mut(key)?;
        if child >= children.len() {
            return None;
        }
        let removed = children.remove(child);
        if children.is_empty() {
            self.remove_group(key);
        }
        Some(removed)
    }

    /// Removes the first child accepted by `matches`.
    ///
    /// The group `hint` is searched first; the remaining groups are scanned
    /// only if nothing matched there.
    pub fn remove_matching(&mut self, hint: Option<&K>, matches: impl Fn(&C) -> bool) -> Option<(K, Arc<C>)> {
        let in_bucket = |children: &[Arc<C>]| children.iter().position(|c| matches(c));

        let found = hint
            .and_then(|key| {
                self.buckets
                    .get(key)
                    .and_then(|children| in_bucket(children))
                    .map(|i| (key.clone(), i))
            })
            .or_else(|| {
                self.index.iter().find_map(|key| {
                    self.buckets
                        .get(key)
                        .and_then(|children| in_bucket(children))
                        .map(|i| (key.clone(), i))
                })
            });

        let (key, i) = found?;
        let removed = self.remove_child(&key, i)?;
        Some((key, removed))
    }

    /// Replaces the child at `child` of group `key`.
    pub fn replace_child(&mut self, key: &K, child: usize, value: Arc<C>) -> Option<Arc<C>> {
        let slot = self.buckets.get_mut(key)?.get_mut(child)?;
        Some(std::mem::replace(slot, value))
    }

    /// Keeps only children accepted by `keep`. Returns the removed children.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &C) -> bool) -> Vec<Arc<C>> {
        let mut removed = Vec::new();
        for (key, children) in self.buckets.iter_mut() {
            let mut kept = Vec::with_capacity(children.len());
            for child in children.drain(..) {
                if keep(key, &child) {
                    kept.push(child);
                } else {
                    removed.push(child);
                }
            }
            *children = kept;
        }
        let emptied: Vec<K> = self
            .buckets
            .iter()
            .filter(|(_, children)| children.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &emptied {
            self.remove_group(key);
        }
        removed
    }

    /// Removes every group.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.insertion.clear();
        self.index.clear();
    }

    /// Sorts the children of every group.
    pub fn sort_children(&mut self, compare: impl Fn(&C, &C) -> Ordering) {
        for children in self.buckets.values_mut() {
            children.sort_by(|a, b| compare(a, b));
        }
    }

    /// Switches between sorted and insertion-ordered groups.
    pub fn set_sorted(&mut self, sorted: bool) {
        self.sorted = sorted;
        self.rebuild_index();
    }

    /// Sets the comparator used while sorted. `None` means natural order.
    pub fn set_comparator(&mut self, comparator: Option<GroupComparator<K>>) {
        self.comparator = comparator;
        self.rebuild_index();
    }

    fn remove_group(&mut self, key: &K) {
        self.buckets.remove(key);
        self.insertion.retain(|k| k != key);
        self.index.retain(|k| k != key);
    }

    fn rebuild_index(&mut self) {
        self.index = self.insertion.clone();
        if self.sorted {
            match &self.comparator {
                Some(compare) => self.index.sort_by(|a, b| compare(a, b)),
                None => self.index.sort(),
            }
        }
    }

    /// Two-level filter.
    ///
    /// A group rejected by `keep_group` is dropped with all its children. A
    /// kept group is pruned to the children accepted by `keep_child` and is
    /// dropped if none remain.
    pub fn filtered(
        &self,
        keep_group: impl Fn(&K) -> bool,
        keep_child: impl Fn(&C) -> bool,
    ) -> Self {
        let mut result = self.empty_like();
        for key in &self.insertion {
            if !keep_group(key) {
                continue;
            }
            let Some(children) = self.buckets.get(key) else {
                continue;
            };
            let kept: Vec<Arc<C>> = children.iter().filter(|c| keep_child(c)).cloned().collect();
            if !kept.is_empty() {
                result.buckets.insert(key.clone(), kept);
                result.insertion.push(key.clone());
            }
        }
        result.rebuild_index();
        result
    }
}

impl<K: GroupKey, C: Send + Sync + 'static> ItemCollection for GroupedData<K, C> {
    fn item_count(&self) -> usize {
        self.group_count()
    }
}

impl<K: GroupKey, C> fmt::Debug for GroupedData<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(key, children)| (key, children.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn years(sorted: bool) -> GroupedData<u32, &'static str> {
        let mut data = GroupedData::new(sorted, None);
        for (year, name) in [(2005, "C"), (2000, "A"), (2000, "B"), (2010, "D")] {
            data.push(year, Arc::new(name));
        }
        data
    }

    fn keys(data: &GroupedData<u32, &'static str>) -> Vec<u32> {
        data.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_sorted_index() {
        let data = years(true);
        assert_eq!(keys(&data), vec![2000, 2005, 2010]);
        assert_eq!(data.child_count(0), Some(2));
        assert_eq!(data.child_total(), 4);
        assert_eq!(**data.child_at(0, 1).unwrap(), "B");
    }

    #[test]
    fn test_insertion_order_and_toggle() {
        let mut data = years(false);
        assert_eq!(keys(&data), vec![2005, 2000, 2010]);

        data.set_sorted(true);
        assert_eq!(keys(&data), vec![2000, 2005, 2010]);

        data.set_comparator(Some(Arc::new(|a: &u32, b: &u32| b.cmp(a))));
        assert_eq!(keys(&data), vec![2010, 2005, 2000]);
    }

    #[test]
    fn test_removing_last_child_drops_group() {
        let mut data = years(true);
        let removed = data.remove_matching(Some(&2005), |c| *c == "C");
        assert_eq!(removed.map(|(k, c)| (k, *c)), Some((2005, "C")));
        assert_eq!(keys(&data), vec![2000, 2010]);
        assert_eq!(data.position_of(&2005), None);
    }

    #[test]
    fn test_remove_falls_back_to_scan() {
        let mut data = years(true);
        let removed = data.remove_matching(Some(&1999), |c| *c == "D");
        assert_eq!(removed.map(|(k, _)| k), Some(2010));
        assert!(data.remove_matching(None, |c| *c == "Z").is_none());
    }

    #[test]
    fn test_two_level_filter() {
        let data = years(true);
        let filtered = data.filtered(|k| *k != 2010, |c| *c != "A");
        assert_eq!(keys(&filtered), vec![2000, 2005]);
        assert_eq!(filtered.child_count(0), Some(1));

        let pruned = data.filtered(|_| true, |c| *c == "A");
        assert_eq!(keys(&pruned), vec![2000]);
        assert_eq!(data.group_count(), 3);
    }

    #[test]
    fn test_retain_and_locate() {
        let mut data = years(true);
        let d = data.child_at(2, 0).unwrap().clone();
        assert_eq!(data.locate(&d), Some((2010, 0)));

        let removed = data.retain(|_, c| *c != "C" && *c != "D");
        assert_eq!(removed.len(), 2);
        assert_eq!(keys(&data), vec![2000]);
        assert_eq!(data.locate(&d), None);
    }
}
