//! Selection: choice modes, checked-state storage and the modal lifecycle.
//!
//! The pieces here are data and pure state transitions. The grouped adapter
//! owns a [`ChoiceState`], feeds it a view of its visible groups through
//! [`ExpandableSource`], and dispatches the resulting [`CheckChange`]s to its
//! [`MultiChoiceListener`] and rendering surface.

mod listener;
mod mode;
mod packed;
mod saved;
mod source;
mod state;
mod store;

pub use listener::{ActionMode, MultiChoiceListener};
pub use mode::ChoiceMode;
pub use packed::PackedPosition;
pub use saved::{SavedId, SavedSelection};
pub use source::ExpandableSource;
pub use state::{CheckChange, ChoiceState, Lifecycle};
pub use store::{CheckStore, CheckStoreKind, CheckedId, IdCheckStore, PositionCheckStore, store_for};
