//! Error types for adapter operations.

use lattice_adapters_core::CoreError;
use thiserror::Error;

use crate::adapter::JsonKind;
use crate::selection::ChoiceMode;

/// Errors returned by adapter operations.
///
/// Every variant except [`AdapterError::Core`] describes a caller mistake:
/// the adapter never retries and never silently repairs these.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// A flat position was outside the collection.
    #[error("position {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A group position was outside the group index.
    #[error("group position {group} out of bounds (group count {len})")]
    GroupOutOfBounds { group: usize, len: usize },

    /// A child position was outside its group.
    #[error("child position {child} out of bounds in group {group} (child count {len})")]
    ChildOutOfBounds { group: usize, child: usize, len: usize },

    /// A visible position refers to an item that is no longer in the full collection.
    #[error("item at visible position {index} is no longer present")]
    StaleItem { index: usize },

    /// Natural-order sort was requested on items without a natural order.
    #[error("items are not naturally comparable: {0}")]
    NotComparable(String),

    /// A loosely-typed value was read as the wrong kind.
    #[error("value at position {index} is {found}, not {expected}")]
    TypeMismatch {
        index: usize,
        expected: JsonKind,
        found: JsonKind,
    },

    /// The input could not be parsed as JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A modal choice mode was requested without a multi-choice listener.
    #[error("choice mode {0:?} requires a multi-choice listener")]
    MissingChoiceListener(ChoiceMode),

    /// Saved selection state could not be restored.
    #[error("invalid saved selection state: {0}")]
    InvalidSavedState(String),

    /// Error from the core systems (thread pool, signals).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

pub(crate) fn check_index(index: usize, len: usize) -> AdapterResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(AdapterError::IndexOutOfBounds { index, len })
    }
}
