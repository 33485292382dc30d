//! Adapter configuration.

use std::fmt;
use std::sync::Arc;

use super::filter::{FilterExecutor, InlineExecutor, PoolExecutor};

/// How overlapping filter passes publish their results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterOrdering {
    /// Every completed pass publishes, in completion order.
    ///
    /// A slow pass started before a fast one can overwrite the newer result.
    #[default]
    PublishAll,
    /// Only the most recently requested pass may publish; older results are dropped.
    LatestOnly,
}

/// Configuration shared by every adapter variant.
#[derive(Clone)]
pub struct AdapterConfig {
    /// Whether mutations emit `data_changed` once the lock is released.
    pub notify_on_change: bool,
    /// Publish policy for overlapping filter passes.
    pub filter_ordering: FilterOrdering,
    /// Where filter passes run.
    pub executor: Arc<dyn FilterExecutor>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            notify_on_change: true,
            filter_ordering: FilterOrdering::default(),
            executor: Arc::new(PoolExecutor::global()),
        }
    }
}

impl AdapterConfig {
    /// Creates the default configuration (notify on, publish all, global pool).
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that runs filter passes on the calling thread.
    pub fn inline() -> Self {
        Self::default().with_executor(InlineExecutor)
    }

    /// Sets the initial notify-on-change flag.
    pub fn with_notify_on_change(mut self, notify: bool) -> Self {
        self.notify_on_change = notify;
        self
    }

    /// Sets the publish policy for overlapping filter passes.
    pub fn with_filter_ordering(mut self, ordering: FilterOrdering) -> Self {
        self.filter_ordering = ordering;
        self
    }

    /// Sets the filter executor.
    pub fn with_executor<E: FilterExecutor + 'static>(mut self, executor: E) -> Self {
        self.executor = Arc::new(executor);
        self
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("notify_on_change", &self.notify_on_change)
            .field("filter_ordering", &self.filter_ordering)
            .field("executor", &self.executor.name())
            .finish()
    }
}

/// Configuration for grouped adapters.
#[derive(Debug, Clone)]
pub struct GroupedAdapterConfig {
    /// Settings shared with flat adapters.
    pub base: AdapterConfig,
    /// Whether the group index is kept sorted (otherwise insertion order).
    pub groups_sorted: bool,
}

impl Default for GroupedAdapterConfig {
    fn default() -> Self {
        Self {
            base: AdapterConfig::default(),
            groups_sorted: true,
        }
    }
}

impl GroupedAdapterConfig {
    /// Sets whether groups are kept sorted.
    pub fn with_groups_sorted(mut self, sorted: bool) -> Self {
        self.groups_sorted = sorted;
        self
    }

    /// Replaces the shared adapter settings.
    pub fn with_base(mut self, base: AdapterConfig) -> Self {
        self.base = base;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert!(config.notify_on_change);
        assert_eq!(config.filter_ordering, FilterOrdering::PublishAll);
        assert_eq!(config.executor.name(), "pool");

        let grouped = GroupedAdapterConfig::default();
        assert!(grouped.groups_sorted);
    }

    #[test]
    fn test_builder_setters() {
        let config = AdapterConfig::inline()
            .with_notify_on_change(false)
            .with_filter_ordering(FilterOrdering::LatestOnly);
        assert!(!config.notify_on_change);
        assert_eq!(config.filter_ordering, FilterOrdering::LatestOnly);
        assert_eq!(config.executor.name(), "inline");

        let debug = format!("{config:?}");
        assert!(debug.contains("inline"));
    }
}
