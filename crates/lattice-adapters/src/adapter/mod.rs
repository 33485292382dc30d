//! Flat adapters and the engine they share.
//!
//! Every adapter is built from the same pieces:
//!
//! - a snapshot store holding the full and visible collections behind one lock
//! - a [`Filter`] that runs [`FilterStrategy`] passes on a [`FilterExecutor`]
//! - [`AdapterSignals`] emitted with the lock released
//!
//! # Adapters
//!
//! - [`ArrayAdapter`]: items of any type, text predicate filtering
//! - [`SparseArrayAdapter`]: items indexed by `i64` keys
//! - [`JsonArrayAdapter`]: `serde_json::Value` items with kind-directed predicates
//!
//! The grouped variant lives in [`crate::grouped`].

mod array_adapter;
mod config;
mod filter;
mod json_adapter;
mod json_dispatch;
mod renderer;
mod signals;
mod snapshot;
mod sparse_adapter;
mod sparse_array;

pub use array_adapter::{ArrayAdapter, StableIdFn, TextPredicate, prefix_predicate};
pub use config::{AdapterConfig, FilterOrdering, GroupedAdapterConfig};
pub use filter::{
    Filter, FilterExecutor, FilterJob, FilterListener, FilterStrategy, InlineExecutor, PoolExecutor,
};
pub use json_adapter::JsonArrayAdapter;
pub use json_dispatch::{
    JsonDispatch, JsonKind, JsonPredicate, JsonPredicates, PredicateKind, TypeClassifier,
};
pub use renderer::{GroupRenderer, ItemRenderer};
pub use signals::AdapterSignals;
pub use snapshot::{ItemCollection, Snapshot};
pub use sparse_adapter::{KeyedPredicate, SparseArrayAdapter};
pub use sparse_array::SparseArray;

pub(crate) use snapshot::SnapshotStore;
