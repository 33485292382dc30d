//! Lattice Adapters - thread-safe, filterable collection adapters for list
//! and grouped views.
//!
//! An adapter decides which items exist, in what order, under what grouping
//! and which are selected. It never decides how they look: rendering is
//! handed to caller-supplied renderers and a [`surface::RenderingSurface`].
//!
//! - [`adapter`]: the snapshot store and filter engine, plus the flat
//!   [`ArrayAdapter`](adapter::ArrayAdapter), [`SparseArrayAdapter`](adapter::SparseArrayAdapter)
//!   and [`JsonArrayAdapter`](adapter::JsonArrayAdapter)
//! - [`grouped`]: [`GroupedAdapter`](grouped::GroupedAdapter) with two-level filtering
//! - [`selection`]: choice modes, checked-state stores and the modal lifecycle
//! - [`surface`]: the weak binding to the view and its deferred-action queue
//!
//! # Example
//!
//! ```
//! use lattice_adapters::prelude::*;
//!
//! let adapter = GroupedAdapter::builder(|film: &(&'static str, u32)| film.1)
//!     .children([("Alien", 1979), ("Aliens", 1986), ("Heat", 1995), ("Ronin", 1998)])
//!     .group_predicate(|year: &u32, constraint: &str| year.to_string().starts_with(constraint))
//!     .executor(InlineExecutor)
//!     .build();
//!
//! adapter.filter().filter("199");
//! assert_eq!(adapter.groups(), vec![1995, 1998]);
//!
//! adapter.set_choice_mode(ChoiceMode::Multiple)?;
//! adapter.set_group_checked(0, true)?;
//! assert_eq!(adapter.checked_count(), 2);
//! # Ok::<(), AdapterError>(())
//! ```

pub mod adapter;
mod error;
pub mod grouped;
pub mod prelude;
pub mod selection;
pub mod surface;

pub use error::{AdapterError, AdapterResult};
