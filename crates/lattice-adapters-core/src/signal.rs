//! Change notification.
//!
//! Every adapter owns a few [`Signal`]s (data changed, data invalidated) and
//! rendering bridges connect slots to them. A slot runs on whichever thread
//! emits: after a background filter pass that is a pool worker, so slots are
//! `Send + Sync` and hop to their own UI thread themselves when they need one.
//!
//! Emission works on a copy of the slot list taken under the lock, so a slot
//! may connect or disconnect slots on the signal that is calling it.
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use lattice_adapters_core::Signal;
//!
//! let data_changed = Signal::<usize>::new();
//! let rows = Arc::new(AtomicUsize::new(0));
//!
//! let seen = rows.clone();
//! let id = data_changed.connect(move |count| seen.store(*count, Ordering::SeqCst));
//! data_changed.emit(3);
//! assert_eq!(rows.load(Ordering::SeqCst), 3);
//!
//! assert!(data_changed.disconnect(id));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::SignalError;
use crate::logging::targets;

new_key_type! {
    /// Identifies one connected slot.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of slots called with `&Args` on every emit.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Adds a slot.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Adds a slot that stays connected only while the returned guard lives.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(slot),
            signal: self,
        }
    }

    /// Removes a slot. Returns `false` if `id` was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    /// Like [`Signal::disconnect`], with an unknown id reported as an error.
    pub fn try_disconnect(&self, id: ConnectionId) -> Result<(), SignalError> {
        self.disconnect(id)
            .then_some(())
            .ok_or(SignalError::InvalidConnection)
    }

    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// While blocked, [`Signal::emit`] drops its argument without calling anything.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::Release);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Calls every slot with `args` on this thread.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "emit suppressed while blocked");
            return;
        }

        let slots: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");
        for slot in &slots {
            slot(&args);
        }
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.slots.lock().len())
            .field("blocked", &self.blocked.load(Ordering::Relaxed))
            .finish()
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);

/// Disconnects its slot when dropped. See [`Signal::connect_scoped`].
pub struct ConnectionGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<'_, Args> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<Args: Clone + Send + 'static>(signal: &Signal<Args>) -> Arc<Mutex<Vec<Args>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        signal.connect(move |args: &Args| sink.lock().push(args.clone()));
        seen
    }

    #[test]
    fn test_emit_reaches_every_slot() {
        let signal = Signal::<usize>::new();
        let first = recorder(&signal);
        let second = recorder(&signal);

        signal.emit(4);
        signal.emit(0);

        assert_eq!(*first.lock(), vec![4, 0]);
        assert_eq!(*second.lock(), vec![4, 0]);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let hits = Arc::new(Mutex::new(0));
        let sink = hits.clone();
        let id = signal.connect(move |_| *sink.lock() += 1);

        signal.emit(());
        assert!(signal.disconnect(id));
        signal.emit(());

        assert_eq!(*hits.lock(), 1);
        assert_eq!(signal.try_disconnect(id), Err(SignalError::InvalidConnection));
    }

    #[test]
    fn test_blocked_signal_is_silent() {
        let signal = Signal::<&'static str>::new();
        let seen = recorder(&signal);

        signal.set_blocked(true);
        signal.emit("dropped");
        signal.set_blocked(false);
        signal.emit("kept");

        assert_eq!(*seen.lock(), vec!["kept"]);
    }

    #[test]
    fn test_scoped_connection() {
        let signal = Signal::<()>::new();
        {
            let _guard = signal.connect_scoped(|_| {});
            assert_eq!(signal.connection_count(), 1);
        }
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_disconnect_itself() {
        let signal = Arc::new(Signal::<()>::new());
        let own_id = Arc::new(Mutex::new(None));

        let (inner, slot_id) = (signal.clone(), own_id.clone());
        let id = signal.connect(move |_| {
            if let Some(id) = *slot_id.lock() {
                inner.disconnect(id);
            }
        });
        *own_id.lock() = Some(id);

        signal.emit(());
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_emit_from_pool_threads() {
        let signal = Arc::new(Signal::<usize>::new());
        let seen = recorder(&signal);

        std::thread::scope(|scope| {
            for pass in 0..8 {
                let signal = signal.clone();
                scope.spawn(move || signal.emit(pass));
            }
        });

        let mut counts = seen.lock().clone();
        counts.sort_unstable();
        assert_eq!(counts, (0..8).collect::<Vec<_>>());
    }
}
