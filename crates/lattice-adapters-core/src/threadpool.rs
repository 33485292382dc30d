//! Background workers for filter passes.
//!
//! Filter passes are fire-and-forget: [`ThreadPool::execute_detached`] hands a
//! job to rayon's work-stealing pool and returns immediately. Callers that need
//! to observe a result use [`ThreadPool::submit`], which returns a [`Pending`]
//! backed by a one-shot channel.
//!
//! There is no cancellation. A submitted job always runs to completion.
//!
//! # Example
//!
//! ```no_run
//! use lattice_adapters_core::threadpool::{ThreadPool, ThreadPoolConfig};
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2))?;
//!
//! let matches = pool.submit(|| ["apple", "avocado", "banana"].iter().filter(|w| w.starts_with('a')).count());
//! assert_eq!(matches.wait(), Some(2));
//!
//! pool.execute_detached(|| {
//!     // publish a filter result nobody waits for
//! });
//! # Ok::<(), lattice_adapters_core::CoreError>(())
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use rayon::{ThreadPool as RayonThreadPool, ThreadPoolBuilder};

use crate::error::{CoreError, ThreadPoolError};
use crate::logging::targets;

static GLOBAL_POOL: OnceLock<ThreadPool> = OnceLock::new();

/// The eventual result of a job started with [`ThreadPool::submit`].
#[derive(Debug)]
pub struct Pending<T> {
    receiver: Receiver<T>,
}

impl<T> Pending<T> {
    /// Whether the result is ready.
    pub fn is_ready(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Takes the result if it is ready.
    pub fn try_take(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until the job finishes. `None` if it panicked.
    pub fn wait(self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Blocks for at most `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// How to build a [`ThreadPool`].
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Worker count. `None` lets rayon pick one per CPU.
    pub threads: Option<usize>,
    /// Prefix of worker thread names; the worker index is appended.
    pub thread_name: String,
    /// Worker stack size in bytes.
    pub stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            threads: None,
            thread_name: "adapter-filter".to_string(),
            stack_size: None,
        }
    }
}

impl ThreadPoolConfig {
    /// Default configuration with exactly `threads` workers.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            ..Default::default()
        }
    }

    /// Sets the worker name prefix.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Sets the worker stack size.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    fn build(&self) -> Result<RayonThreadPool, ThreadPoolError> {
        let prefix = self.thread_name.clone();
        let mut builder = ThreadPoolBuilder::new().thread_name(move |index| format!("{prefix}-{index}"));
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        builder
            .panic_handler(|_| tracing::error!(target: targets::THREAD_POOL, "filter job panicked"))
            .build()
            .map_err(|e| ThreadPoolError::CreationFailed(e.to_string()))
    }
}

enum Workers {
    Rayon(RayonThreadPool),
    /// No worker threads could be started; jobs run on the submitting thread.
    CallerRuns,
}

/// A pool of filter workers.
pub struct ThreadPool {
    workers: Workers,
    in_flight: Arc<AtomicUsize>,
}

impl ThreadPool {
    /// The process-wide pool, built with the default configuration on first use.
    ///
    /// If no worker thread can be started, jobs run on the caller's thread.
    pub fn global() -> &'static ThreadPool {
        GLOBAL_POOL.get_or_init(|| {
            ThreadPool::new(ThreadPoolConfig::default()).unwrap_or_else(|err| {
                tracing::error!(target: targets::THREAD_POOL, %err, "running filter passes on the caller");
                ThreadPool {
                    workers: Workers::CallerRuns,
                    in_flight: Arc::default(),
                }
            })
        })
    }

    /// Builds the process-wide pool from `config`.
    ///
    /// Fails if the global pool already exists, including when an earlier
    /// call to [`ThreadPool::global`] created it.
    pub fn init_global(config: ThreadPoolConfig) -> Result<&'static ThreadPool, CoreError> {
        let pool = ThreadPool::new(config)?;
        GLOBAL_POOL
            .set(pool)
            .map_err(|_| ThreadPoolError::AlreadyInitialized)?;
        GLOBAL_POOL
            .get()
            .ok_or_else(|| ThreadPoolError::AlreadyInitialized.into())
    }

    /// Builds a dedicated pool.
    pub fn new(config: ThreadPoolConfig) -> Result<Self, CoreError> {
        let pool = config.build()?;
        tracing::debug!(
            target: targets::THREAD_POOL,
            threads = pool.current_num_threads(),
            name = %config.thread_name,
            "filter pool created"
        );
        Ok(Self {
            workers: Workers::Rayon(pool),
            in_flight: Arc::default(),
        })
    }

    /// Number of worker threads. Zero when jobs run on the caller.
    pub fn threads(&self) -> usize {
        match &self.workers {
            Workers::Rayon(pool) => pool.current_num_threads(),
            Workers::CallerRuns => 0,
        }
    }

    /// Jobs queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Queues `job` and returns immediately.
    pub fn execute_detached<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(self.in_flight.clone());
        let tracked = move || {
            let _guard = guard;
            job();
        };
        match &self.workers {
            Workers::Rayon(pool) => pool.spawn(tracked),
            Workers::CallerRuns => tracked(),
        }
    }

    /// Queues `job` and returns a handle to its result.
    pub fn submit<F, T>(&self, job: F) -> Pending<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        self.execute_detached(move || {
            let _ = sender.send(job());
        });
        Pending { receiver }
    }
}

/// Releases one in-flight slot when dropped, including during a panic unwind.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("threads", &self.threads())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

static_assertions::assert_impl_all!(ThreadPool: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_and_wait() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(2)).unwrap();
        assert_eq!(pool.threads(), 2);
        assert_eq!(pool.submit(|| "cherry".len()).wait(), Some(6));
    }

    #[test]
    fn test_pending_is_not_ready_before_job_ends() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(1)).unwrap();
        let (release, gate) = bounded::<()>(0);
        let pending = pool.submit(move || {
            let _ = gate.recv();
            3
        });

        assert!(!pending.is_ready());
        assert_eq!(pending.try_take(), None);
        assert_eq!(pool.in_flight(), 1);

        drop(release);
        assert_eq!(pending.wait_timeout(Duration::from_secs(5)), Some(3));
    }

    #[test]
    fn test_detached_jobs_all_run() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(3).thread_name("test-filter")).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();

        for pass in 0..10 {
            let tx = tx.clone();
            pool.execute_detached(move || {
                let _ = tx.send(pass);
            });
        }
        drop(tx);

        let mut seen: Vec<i32> = rx.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_panicking_job_releases_its_slot() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(1)).unwrap();
        let pending = pool.submit(|| -> usize { panic!("filter predicate failed") });
        assert_eq!(pending.wait_timeout(Duration::from_secs(5)), None);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while pool.in_flight() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.in_flight(), 0);

        // The worker survives the panic.
        assert_eq!(pool.submit(|| 7).wait(), Some(7));
    }

    #[test]
    fn test_workers_are_named() {
        let pool = ThreadPool::new(ThreadPoolConfig::with_threads(1).thread_name("named")).unwrap();
        let name = pool.submit(|| std::thread::current().name().map(str::to_owned)).wait();
        assert_eq!(name, Some(Some("named-0".to_string())));
    }

    #[test]
    fn test_global_pool_runs_jobs() {
        let pool = ThreadPool::global();
        assert_eq!(pool.submit(|| 40 + 2).wait(), Some(42));
        assert!(ThreadPool::init_global(ThreadPoolConfig::default()).is_err());
    }
}
