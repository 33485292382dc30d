//! Binding between an adapter and the rendering surface that displays it.
//!
//! The adapter never owns the surface. While attached it holds a weak
//! handle; a handle whose surface has been dropped counts as detached.
//! Actions that need a surface and arrive while detached are queued and
//! handed back on the next attach.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::debug;

use lattice_adapters_core::logging::targets;

/// The view side of a grouped adapter.
pub trait RenderingSurface: Send + Sync {
    /// Re-applies checked state to the rows currently on screen.
    fn refresh_checked_states(&self);

    /// Expands a group. Returns `false` if it was already expanded.
    fn expand_group(&self, group: usize) -> bool;

    /// Collapses a group. Returns `false` if it was already collapsed.
    fn collapse_group(&self, group: usize) -> bool;

    /// Shows the contextual action bar.
    fn start_action_mode(&self) {}

    /// Hides the contextual action bar.
    fn finish_action_mode(&self) {}
}

/// Surface work postponed until a surface is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    ExpandAll,
    CollapseAll,
    StartLifecycle,
}

enum BindingState {
    Detached { pending: Vec<DeferredAction> },
    Attached(Weak<dyn RenderingSurface>),
}

/// Attached/detached state plus the queue of deferred actions.
pub struct SurfaceBinding {
    state: BindingState,
}

impl Default for SurfaceBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceBinding {
    /// Creates a detached binding with an empty queue.
    pub fn new() -> Self {
        Self {
            state: BindingState::Detached { pending: Vec::new() },
        }
    }

    /// Attaches `surface` and returns the queued actions, oldest first.
    pub fn attach(&mut self, surface: &Arc<dyn RenderingSurface>) -> Vec<DeferredAction> {
        let previous = std::mem::replace(&mut self.state, BindingState::Attached(Arc::downgrade(surface)));
        match previous {
            BindingState::Detached { pending } => {
                if !pending.is_empty() {
                    debug!(target: targets::SURFACE, count = pending.len(), "flushing deferred surface actions");
                }
                pending
            }
            BindingState::Attached(_) => Vec::new(),
        }
    }

    /// Drops the surface handle. Nothing is queued yet.
    pub fn detach(&mut self) {
        if matches!(self.state, BindingState::Attached(_)) {
            self.state = BindingState::Detached { pending: Vec::new() };
        }
    }

    /// The attached surface, if it is still alive.
    pub fn live(&mut self) -> Option<Arc<dyn RenderingSurface>> {
        let BindingState::Attached(weak) = &self.state else {
            return None;
        };
        let surface = weak.upgrade();
        if surface.is_none() {
            debug!(target: targets::SURFACE, "rendering surface dropped, binding detached");
            self.state = BindingState::Detached { pending: Vec::new() };
        }
        surface
    }

    /// Whether a live surface is attached.
    pub fn is_attached(&mut self) -> bool {
        self.live().is_some()
    }

    /// Returns the live surface, or queues `action` if there is none.
    pub fn run_or_defer(&mut self, action: DeferredAction) -> Option<Arc<dyn RenderingSurface>> {
        if let Some(surface) = self.live() {
            return Some(surface);
        }
        if let BindingState::Detached { pending } = &mut self.state {
            let opposite = match action {
                DeferredAction::ExpandAll => Some(DeferredAction::CollapseAll),
                DeferredAction::CollapseAll => Some(DeferredAction::ExpandAll),
                DeferredAction::StartLifecycle => None,
            };
            pending.retain(|queued| Some(*queued) != opposite && *queued != action);
            pending.push(action);
            debug!(target: targets::SURFACE, ?action, "surface detached, action deferred");
        }
        None
    }

    /// Removes `action` from the queue.
    pub fn cancel(&mut self, action: DeferredAction) {
        if let BindingState::Detached { pending } = &mut self.state {
            pending.retain(|queued| *queued != action);
        }
    }

    /// Queued actions, oldest first.
    pub fn pending(&self) -> &[DeferredAction] {
        match &self.state {
            BindingState::Detached { pending } => pending.as_slice(),
            BindingState::Attached(_) => &[],
        }
    }
}

impl fmt::Debug for SurfaceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            BindingState::Detached { pending } => f
                .debug_struct("SurfaceBinding")
                .field("attached", &false)
                .field("pending", pending)
                .finish(),
            BindingState::Attached(weak) => f
                .debug_struct("SurfaceBinding")
                .field("attached", &(weak.strong_count() > 0))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSurface;

    impl RenderingSurface for NullSurface {
        fn refresh_checked_states(&self) {}

        fn expand_group(&self, _group: usize) -> bool {
            true
        }

        fn collapse_group(&self, _group: usize) -> bool {
            true
        }
    }

    #[test]
    fn test_defer_while_detached() {
        let mut binding = SurfaceBinding::new();
        assert!(binding.run_or_defer(DeferredAction::ExpandAll).is_none());
        assert!(binding.run_or_defer(DeferredAction::StartLifecycle).is_none());
        assert!(binding.run_or_defer(DeferredAction::ExpandAll).is_none());
        assert_eq!(
            binding.pending(),
            &[DeferredAction::StartLifecycle, DeferredAction::ExpandAll]
        );

        binding.run_or_defer(DeferredAction::CollapseAll);
        assert_eq!(
            binding.pending(),
            &[DeferredAction::StartLifecycle, DeferredAction::CollapseAll]
        );
    }

    #[test]
    fn test_attach_flushes_queue() {
        let mut binding = SurfaceBinding::new();
        binding.run_or_defer(DeferredAction::ExpandAll);

        let surface: Arc<dyn RenderingSurface> = Arc::new(NullSurface);
        assert_eq!(binding.attach(&surface), vec![DeferredAction::ExpandAll]);
        assert!(binding.is_attached());
        assert!(binding.run_or_defer(DeferredAction::ExpandAll).is_some());
        assert!(binding.pending().is_empty());
    }

    #[test]
    fn test_dead_surface_counts_as_detached() {
        let mut binding = SurfaceBinding::new();
        let surface: Arc<dyn RenderingSurface> = Arc::new(NullSurface);
        binding.attach(&surface);
        drop(surface);

        assert!(!binding.is_attached());
        assert!(binding.run_or_defer(DeferredAction::CollapseAll).is_none());
        assert_eq!(binding.pending(), &[DeferredAction::CollapseAll]);
    }

    #[test]
    fn test_cancel() {
        let mut binding = SurfaceBinding::new();
        binding.run_or_defer(DeferredAction::StartLifecycle);
        binding.cancel(DeferredAction::StartLifecycle);
        assert!(binding.pending().is_empty());
    }
}
