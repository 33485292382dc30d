//! Builder for [`GroupedAdapter`].

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::adapter::{
    ChildPredicate, GroupFn, GroupPredicate, GroupPredicates, GroupedAdapter, StableIds, derive_key,
};
use super::data::{GroupComparator, GroupKey, GroupedData};
use super::key_cache::{GroupKeyCache, NoKeyCache};
use crate::adapter::{Filter, FilterExecutor, GroupedAdapterConfig, SnapshotStore};
use crate::selection::ChoiceState;
use crate::surface::SurfaceBinding;

/// Assembles a [`GroupedAdapter`].
///
/// ```
/// use lattice_adapters::adapter::InlineExecutor;
/// use lattice_adapters::grouped::GroupedAdapter;
///
/// let adapter = GroupedAdapter::builder(|name: &String| name.chars().next().unwrap_or(' '))
///     .children(["bob", "alice", "bea"].map(String::from))
///     .group_predicate(|initial: &char, constraint: &str| constraint.starts_with(*initial))
///     .executor(InlineExecutor)
///     .build();
///
/// adapter.filter().filter("b");
/// assert_eq!(adapter.groups(), vec!['b']);
/// ```
pub struct GroupedAdapterBuilder<K, C> {
    group_of: GroupFn<K, C>,
    children: Vec<C>,
    config: GroupedAdapterConfig,
    comparator: Option<GroupComparator<K>>,
    group_predicate: Option<GroupPredicate<K>>,
    child_predicate: Option<ChildPredicate<C>>,
    ids: Option<StableIds<K, C>>,
    key_cache: Option<Arc<dyn GroupKeyCache<K, C>>>,
}

impl<K: GroupKey, C: Send + Sync + 'static> GroupedAdapterBuilder<K, C> {
    /// Creates a builder around the group key function.
    pub fn new<F>(group_of: F) -> Self
    where
        F: Fn(&C) -> K + Send + Sync + 'static,
    {
        Self {
            group_of: Arc::new(group_of),
            children: Vec::new(),
            config: GroupedAdapterConfig::default(),
            comparator: None,
            group_predicate: None,
            child_predicate: None,
            ids: None,
            key_cache: None,
        }
    }

    /// Adds initial children.
    pub fn children(mut self, children: impl IntoIterator<Item = C>) -> Self {
        self.children.extend(children);
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: GroupedAdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets whether groups are sorted.
    pub fn groups_sorted(mut self, sorted: bool) -> Self {
        self.config.groups_sorted = sorted;
        self
    }

    /// Orders groups with a custom comparator.
    pub fn group_comparator<F>(mut self, compare: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(compare));
        self
    }

    /// Sets the group-level filter predicate.
    pub fn group_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&K, &str) -> bool + Send + Sync + 'static,
    {
        self.group_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the child-level filter predicate.
    pub fn child_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, &str) -> bool + Send + Sync + 'static,
    {
        self.child_predicate = Some(Arc::new(predicate));
        self
    }

    /// Declares stable ids. Selection then tracks checks by id.
    pub fn stable_ids<G, H>(mut self, group_id: G, child_id: H) -> Self
    where
        G: Fn(&K) -> u64 + Send + Sync + 'static,
        H: Fn(&C) -> u64 + Send + Sync + 'static,
    {
        self.ids = Some(StableIds {
            group: Arc::new(group_id),
            child: Arc::new(child_id),
        });
        self
    }

    /// Installs a group key cache.
    pub fn key_cache<Q>(mut self, cache: Arc<Q>) -> Self
    where
        Q: GroupKeyCache<K, C> + 'static,
    {
        self.key_cache = Some(cache);
        self
    }

    /// Sets where filter passes run.
    pub fn executor<E: FilterExecutor + 'static>(mut self, executor: E) -> Self {
        self.config.base = self.config.base.with_executor(executor);
        self
    }

    /// Builds the adapter.
    pub fn build(self) -> GroupedAdapter<K, C> {
        let key_cache: Arc<dyn GroupKeyCache<K, C>> = self.key_cache.unwrap_or_else(|| Arc::new(NoKeyCache));

        let mut data = GroupedData::new(self.config.groups_sorted, self.comparator);
        for child in self.children {
            let child = Arc::new(child);
            let key = derive_key(&self.group_of, key_cache.as_ref(), &child);
            key_cache.put(&child, &key);
            data.push(key, child);
        }

        let base = self.config.base;
        let store = Arc::new(SnapshotStore::new(data, &base));
        let predicates = Arc::new(GroupPredicates::new(self.group_predicate, self.child_predicate));
        let filter = Filter::new(&store, predicates.clone(), base.executor.clone());
        let stable = self.ids.is_some();

        GroupedAdapter {
            store,
            filter,
            predicates,
            group_of: self.group_of,
            key_cache,
            ids: self.ids,
            selection: Mutex::new(ChoiceState::new(stable)),
            listener: RwLock::new(None),
            surface: Mutex::new(SurfaceBinding::new()),
        }
    }
}
