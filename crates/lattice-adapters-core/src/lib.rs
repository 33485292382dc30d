//! Core systems for Lattice Adapters.
//!
//! This crate provides the foundational pieces the adapter engine is built on:
//!
//! - **Signal/Slot System**: Type-safe change notification
//! - **Thread Pool**: Fire-and-forget background execution for filter passes
//! - **Logging**: Tracing targets, timing spans and a tree formatter for debugging
//!
//! # Signal/Slot Example
//!
//! ```
//! use lattice_adapters_core::Signal;
//!
//! let data_changed = Signal::<()>::new();
//!
//! let conn_id = data_changed.connect(|_| {
//!     println!("refresh the list");
//! });
//!
//! data_changed.emit(());
//! data_changed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod threadpool;

pub use error::{CoreError, Result, SignalError, ThreadPoolError};
pub use logging::{PerfSpan, TreeFormatter, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use threadpool::{Pending, ThreadPool, ThreadPoolConfig};
