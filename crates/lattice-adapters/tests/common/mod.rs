//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use lattice_adapters::prelude::*;

/// Routes adapter logs to the test output. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub title: &'static str,
    pub year: u32,
}

pub fn movie(title: &'static str, year: u32) -> Movie {
    Movie { title, year }
}

pub fn titles(children: &[Arc<Movie>]) -> Vec<&'static str> {
    children.iter().map(|m| m.title).collect()
}

/// `[A(2000), B(2000), C(2005)]` grouped by year, filtered by a group
/// predicate matching years that contain the constraint's digits.
pub fn movies() -> GroupedAdapter<u32, Movie> {
    GroupedAdapter::builder(|m: &Movie| m.year)
        .children([movie("A", 2000), movie("B", 2000), movie("C", 2005)])
        .group_predicate(|year: &u32, constraint: &str| year.to_string().contains(constraint))
        .child_predicate(|_: &Movie, _: &str| true)
        .executor(InlineExecutor)
        .build()
}

/// Listener recording lifecycle events.
#[derive(Default)]
pub struct Lifecycles {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub changes: Mutex<Vec<(usize, Option<usize>, bool)>>,
}

impl Lifecycles {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl MultiChoiceListener for Lifecycles {
    fn on_create_action_mode(&self, _mode: &ActionMode) -> bool {
        self.created.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn on_destroy_action_mode(&self, _mode: &ActionMode) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_group_checked_state_changed(&self, _mode: &ActionMode, group: usize, _id: u64, checked: bool) {
        self.changes.lock().push((group, None, checked));
    }

    fn on_child_checked_state_changed(
        &self,
        _mode: &ActionMode,
        group: usize,
        child: usize,
        _id: u64,
        checked: bool,
    ) {
        self.changes.lock().push((group, Some(child), checked));
    }
}

/// Surface that accepts everything.
#[derive(Default)]
pub struct NullSurface {
    pub action_bar: Mutex<bool>,
}

impl RenderingSurface for NullSurface {
    fn refresh_checked_states(&self) {}

    fn expand_group(&self, _group: usize) -> bool {
        true
    }

    fn collapse_group(&self, _group: usize) -> bool {
        true
    }

    fn start_action_mode(&self) {
        *self.action_bar.lock() = true;
    }

    fn finish_action_mode(&self) {
        *self.action_bar.lock() = false;
    }
}

/// Attaches a fresh [`NullSurface`]. Keep the returned handle alive.
pub fn attach_null_surface<K, C>(adapter: &GroupedAdapter<K, C>) -> Arc<NullSurface>
where
    K: lattice_adapters::grouped::GroupKey,
    C: Send + Sync + 'static,
{
    let surface = Arc::new(NullSurface::default());
    let handle: Arc<dyn RenderingSurface> = surface.clone();
    adapter.attach_surface(&handle);
    surface
}
