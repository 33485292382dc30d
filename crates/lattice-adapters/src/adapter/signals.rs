//! Change notification signals shared by every adapter.

use lattice_adapters_core::Signal;

/// Signals emitted by adapters when their visible content changes.
///
/// Rendering bridges connect to these and redraw. `data_invalidated` is only
/// emitted when a filter pass publishes an empty result, so a bridge can show an
/// empty state instead of an empty list.
#[derive(Debug, Default)]
pub struct AdapterSignals {
    /// Emitted after the visible collection changed.
    pub data_changed: Signal<()>,

    /// Emitted after a filter pass published an empty result.
    pub data_invalidated: Signal<()>,
}

impl AdapterSignals {
    /// Creates a new set of adapter signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits the signal matching a published result size.
    pub fn emit_for_count(&self, count: usize) {
        if count > 0 {
            self.data_changed.emit(());
        } else {
            self.data_invalidated.emit(());
        }
    }
}
