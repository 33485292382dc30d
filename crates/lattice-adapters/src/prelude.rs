//! Prelude module for Lattice Adapters.
//!
//! Re-exports the types most callers need:
//!
//! ```ignore
//! use lattice_adapters::prelude::*;
//! ```

// ============================================================================
// Errors
// ============================================================================

pub use crate::{AdapterError, AdapterResult};

// ============================================================================
// Signals
// ============================================================================

pub use lattice_adapters_core::{ConnectionId, Signal};

// ============================================================================
// Flat Adapters and Filtering
// ============================================================================

pub use crate::adapter::{
    AdapterConfig, AdapterSignals, ArrayAdapter, Filter, FilterExecutor, FilterOrdering, InlineExecutor,
    ItemRenderer, JsonArrayAdapter, JsonKind, JsonPredicates, PoolExecutor, SparseArray, SparseArrayAdapter,
    prefix_predicate,
};

// ============================================================================
// Grouped Adapters
// ============================================================================

pub use crate::adapter::{GroupRenderer, GroupedAdapterConfig};
pub use crate::grouped::{GroupedAdapter, GroupedAdapterBuilder};

// ============================================================================
// Selection and Surface
// ============================================================================

pub use crate::selection::{
    ActionMode, CheckStoreKind, ChoiceMode, Lifecycle, MultiChoiceListener, PackedPosition, SavedSelection,
};
pub use crate::surface::{DeferredAction, RenderingSurface};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_types_exist() {
        let _signal: Signal<()> = Signal::new();
        let _config = AdapterConfig::inline().with_filter_ordering(FilterOrdering::LatestOnly);
        let _array: ArrayAdapter<String> = ArrayAdapter::new();
        let _sparse: SparseArrayAdapter<String> = SparseArrayAdapter::new();
        let _json = JsonArrayAdapter::new();
        let _packed = PackedPosition::child(0, 0);
        assert_eq!(ChoiceMode::default(), ChoiceMode::None);
    }
}
