//! Asynchronous filtering.
//!
//! A filter pass has three phases. Under the adapter lock it records the
//! constraint and copies the full collection. Off the lock it runs the
//! adapter's [`FilterStrategy`]. Under the lock again it installs the result,
//! then emits `data_changed` (non-empty) or `data_invalidated` (empty) with the
//! lock released.
//!
//! Passes are fire-and-forget: there is no cancellation, and with
//! [`FilterOrdering::PublishAll`](super::FilterOrdering::PublishAll) results
//! publish in completion order, not request order.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use lattice_adapters_core::logging::targets;
use lattice_adapters_core::{PerfSpan, ThreadPool, ThreadPoolConfig};

use super::snapshot::{Acquired, ItemCollection, SnapshotStore};
use crate::error::AdapterResult;

/// A unit of filter work.
pub type FilterJob = Box<dyn FnOnce() + Send + 'static>;

/// Callback receiving the size of a published filter result.
pub type FilterListener = Box<dyn FnOnce(usize) + Send + 'static>;

/// Runs filter passes.
pub trait FilterExecutor: Send + Sync {
    /// Runs `job`, now or later, on any thread.
    fn execute(&self, job: FilterJob);

    /// Short name for diagnostics.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Runs filter passes on a rayon-backed [`ThreadPool`].
#[derive(Debug, Clone, Default)]
pub struct PoolExecutor {
    pool: Option<Arc<ThreadPool>>,
}

impl PoolExecutor {
    /// Uses the process-wide pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Uses a caller-owned pool.
    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self { pool: Some(pool) }
    }

    /// Builds a dedicated pool from `config`.
    pub fn with_config(config: ThreadPoolConfig) -> AdapterResult<Self> {
        let pool = ThreadPool::new(config)?;
        Ok(Self::with_pool(Arc::new(pool)))
    }
}

impl FilterExecutor for PoolExecutor {
    fn execute(&self, job: FilterJob) {
        match &self.pool {
            Some(pool) => pool.execute_detached(job),
            None => ThreadPool::global().execute_detached(job),
        }
    }

    fn name(&self) -> &'static str {
        "pool"
    }
}

/// Runs filter passes synchronously on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl FilterExecutor for InlineExecutor {
    fn execute(&self, job: FilterJob) {
        job();
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}

/// The per-adapter matching step of a filter pass.
pub trait FilterStrategy<C>: Send + Sync + 'static {
    /// Returns the subset of `source` that matches `constraint`.
    fn perform(&self, source: C, constraint: &str) -> C;
}

/// Handle used to request filter passes on an adapter.
///
/// Holds the adapter's data weakly: passes still queued after the adapter is
/// dropped do nothing.
pub struct Filter<C> {
    store: Weak<SnapshotStore<C>>,
    strategy: Arc<dyn FilterStrategy<C>>,
    executor: Arc<dyn FilterExecutor>,
}

impl<C: ItemCollection> Filter<C> {
    pub(crate) fn new(
        store: &Arc<SnapshotStore<C>>,
        strategy: Arc<dyn FilterStrategy<C>>,
        executor: Arc<dyn FilterExecutor>,
    ) -> Self {
        Self {
            store: Arc::downgrade(store),
            strategy,
            executor,
        }
    }

    /// Requests a filter pass. A blank constraint clears the filter.
    pub fn filter(&self, constraint: &str) {
        self.submit(constraint, None);
    }

    /// Requests a filter pass and reports the result size to `listener`.
    pub fn filter_with_listener<F>(&self, constraint: &str, listener: F)
    where
        F: FnOnce(usize) + Send + 'static,
    {
        self.submit(constraint, Some(Box::new(listener)));
    }

    fn submit(&self, constraint: &str, listener: Option<FilterListener>) {
        let store = self.store.clone();
        let strategy = self.strategy.clone();
        let constraint = constraint.to_owned();
        trace!(target: targets::FILTER, %constraint, executor = self.executor.name(), "filter requested");
        self.executor.execute(Box::new(move || {
            run_pass(&store, strategy.as_ref(), &constraint, listener);
        }));
    }
}

fn run_pass<C: ItemCollection>(
    store: &Weak<SnapshotStore<C>>,
    strategy: &dyn FilterStrategy<C>,
    constraint: &str,
    listener: Option<FilterListener>,
) {
    let Some(store) = store.upgrade() else {
        trace!(target: targets::FILTER, "adapter dropped before filter pass ran");
        return;
    };
    let _span = PerfSpan::new("filter_pass");

    let count = match store.acquire(constraint) {
        Acquired::Reset { count } => {
            store.signals().emit_for_count(count);
            count
        }
        Acquired::Source { source, generation } => {
            let result = strategy.perform(source, constraint);
            let count = result.item_count();
            if store.publish(result, generation) {
                debug!(target: targets::FILTER, constraint, count, "filter result published");
                store.signals().emit_for_count(count);
            } else {
                debug!(target: targets::FILTER, constraint, generation, "stale filter result dropped");
            }
            count
        }
    };

    if let Some(listener) = listener {
        listener(count);
    }
}

impl<C> fmt::Debug for Filter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("executor", &self.executor.name())
            .field("attached", &(self.store.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EvenOnly;

    impl FilterStrategy<Vec<i32>> for EvenOnly {
        fn perform(&self, source: Vec<i32>, _constraint: &str) -> Vec<i32> {
            source.into_iter().filter(|n| n % 2 == 0).collect()
        }
    }

    fn store_and_filter(items: Vec<i32>) -> (Arc<SnapshotStore<Vec<i32>>>, Filter<Vec<i32>>) {
        let store = Arc::new(SnapshotStore::new(items, &AdapterConfig::inline()));
        let filter = Filter::new(&store, Arc::new(EvenOnly), Arc::new(InlineExecutor));
        (store, filter)
    }

    #[test]
    fn test_inline_filter_publishes() {
        let (store, filter) = store_and_filter(vec![1, 2, 3, 4]);
        let reported = Arc::new(AtomicUsize::new(usize::MAX));

        let r = reported.clone();
        filter.filter_with_listener("even", move |count| r.store(count, Ordering::SeqCst));

        assert_eq!(reported.load(Ordering::SeqCst), 2);
        assert_eq!(store.read(|s| s.visible().clone()), vec![2, 4]);
        assert_eq!(store.read(|s| s.full().clone()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_result_invalidates() {
        let (store, filter) = store_and_filter(vec![1, 3]);
        let invalidated = Arc::new(AtomicUsize::new(0));

        let i = invalidated.clone();
        store.signals().data_invalidated.connect(move |_| {
            i.fetch_add(1, Ordering::SeqCst);
        });

        filter.filter("even");
        assert_eq!(invalidated.load(Ordering::SeqCst), 1);
        assert!(store.read(|s| s.visible().is_empty()));
    }

    #[test]
    fn test_dropped_adapter_skips_pass() {
        let (store, filter) = store_and_filter(vec![1, 2]);
        drop(store);

        let called = Arc::new(AtomicUsize::new(0));
        let c = called.clone();
        filter.filter_with_listener("even", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pool_executor_runs_job() {
        let executor = PoolExecutor::with_config(ThreadPoolConfig::with_threads(1)).unwrap();
        let (tx, rx) = crossbeam_channel::bounded(1);
        executor.execute(Box::new(move || {
            let _ = tx.send(7);
        }));
        assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(5)), Ok(7));
    }
}
