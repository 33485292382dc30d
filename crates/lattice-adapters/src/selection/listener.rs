//! Callbacks for the modal action lifecycle.

/// Handle identifying one modal lifecycle session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionMode {
    session: u64,
}

impl ActionMode {
    pub(crate) fn new(session: u64) -> Self {
        Self { session }
    }

    /// Sequence number of the session; increases with every lifecycle start.
    pub fn session(&self) -> u64 {
        self.session
    }
}

/// Receives lifecycle and checked-state events in modal choice modes.
///
/// All methods run on the thread that triggered the event, with no adapter
/// lock held, so implementations may call back into the adapter.
pub trait MultiChoiceListener: Send + Sync {
    /// A lifecycle is starting. Returning `false` aborts it; checks stay.
    fn on_create_action_mode(&self, mode: &ActionMode) -> bool;

    /// Called right after a successful create.
    fn on_prepare_action_mode(&self, _mode: &ActionMode) -> bool {
        false
    }

    /// An action item was clicked. Returns whether it was handled.
    fn on_action_item_clicked(&self, _mode: &ActionMode, _item_id: u32) -> bool {
        false
    }

    /// The lifecycle ended. Checks have already been cleared.
    fn on_destroy_action_mode(&self, mode: &ActionMode);

    /// A group's checked state changed while the lifecycle was active.
    fn on_group_checked_state_changed(&self, mode: &ActionMode, group: usize, id: u64, checked: bool);

    /// A child's checked state changed while the lifecycle was active.
    fn on_child_checked_state_changed(
        &self,
        mode: &ActionMode,
        group: usize,
        child: usize,
        id: u64,
        checked: bool,
    );
}
