//! Grouped adapters: children bucketed under derived group keys.
//!
//! [`GroupedAdapter`] combines the snapshot store and filter engine shared
//! with the flat adapters, a [`GroupedData`] index, the selection state
//! machine and a binding to the rendering surface.

mod adapter;
mod builder;
mod choice;
mod data;
mod key_cache;

pub use adapter::{
    ChildIdFn, ChildPredicate, GroupFn, GroupIdFn, GroupPredicate, GroupedAdapter, combine_child_id,
    combine_group_id,
};
pub use builder::GroupedAdapterBuilder;
pub use data::{GroupComparator, GroupKey, GroupedData};
pub use key_cache::{GroupKeyCache, IdentityKeyCache, NoKeyCache};
