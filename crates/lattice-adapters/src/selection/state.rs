//! The selection state machine.
//!
//! [`ChoiceState`] owns the mode, the checked-state store and the lifecycle
//! phase. It never calls out: every operation returns the list of checked
//! state changes it made, and the owning adapter forwards them to listeners
//! and the rendering surface once its locks are released.

use super::listener::ActionMode;
use super::mode::ChoiceMode;
use super::packed::PackedPosition;
use super::saved::SavedSelection;
use super::source::ExpandableSource;
use super::store::{CheckStore, CheckStoreKind, CheckedId, store_for};
use crate::error::{AdapterError, AdapterResult};

/// Phase of the modal action lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    /// No lifecycle.
    #[default]
    Inactive,
    /// Requested while no rendering surface was attached.
    Pending,
    /// Running.
    Active(ActionMode),
}

impl Lifecycle {
    /// Whether a lifecycle is requested or running.
    pub fn is_open(self) -> bool {
        self != Lifecycle::Inactive
    }
}

/// One checked-state change made by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckChange {
    pub position: PackedPosition,
    /// Group id for groups, child id for children.
    pub id: u64,
    pub checked: bool,
}

/// Mode, checked state and lifecycle phase of one adapter.
#[derive(Debug)]
pub struct ChoiceState {
    mode: ChoiceMode,
    store: Box<dyn CheckStore>,
    lifecycle: Lifecycle,
    sessions: u64,
}

impl ChoiceState {
    /// Creates a disabled state machine with the store matching `stable_ids`.
    pub fn new(stable_ids: bool) -> Self {
        Self {
            mode: ChoiceMode::None,
            store: store_for(stable_ids),
            lifecycle: Lifecycle::Inactive,
            sessions: 0,
        }
    }

    pub fn mode(&self) -> ChoiceMode {
        self.mode
    }

    pub fn store_kind(&self) -> CheckStoreKind {
        self.store.kind()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn checked_count(&self) -> usize {
        self.store.checked_count()
    }

    pub fn is_checked(&self, position: PackedPosition, source: &dyn ExpandableSource) -> bool {
        self.store.is_checked(position, source)
    }

    pub fn checked_positions(&self, source: &dyn ExpandableSource) -> Vec<PackedPosition> {
        self.store.checked_positions(source)
    }

    pub fn checked_ids(&self) -> Vec<CheckedId> {
        self.store.checked_ids()
    }

    /// Switches mode and clears every check. End any lifecycle first.
    pub fn set_mode(&mut self, mode: ChoiceMode) {
        self.mode = mode;
        self.store.clear();
    }

    /// Unchecks everything without touching the lifecycle.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Checks or unchecks a child.
    pub fn set_child_checked(
        &mut self,
        source: &dyn ExpandableSource,
        group: usize,
        child: usize,
        checked: bool,
    ) -> AdapterResult<Vec<CheckChange>> {
        check_child(source, group, child)?;
        let mut changes = Vec::new();
        if !self.mode.is_enabled() {
            return Ok(changes);
        }

        let position = PackedPosition::child(group, child);
        if self.mode.is_single() {
            self.check_exclusively(source, position, checked, &mut changes);
        } else {
            self.apply(source, position, checked, &mut changes);
            self.reconcile_group(source, group, &mut changes);
        }
        Ok(changes)
    }

    /// Checks or unchecks a group. In multiple modes all its children follow.
    pub fn set_group_checked(
        &mut self,
        source: &dyn ExpandableSource,
        group: usize,
        checked: bool,
    ) -> AdapterResult<Vec<CheckChange>> {
        check_group(source, group)?;
        let mut changes = Vec::new();
        if !self.mode.is_enabled() {
            return Ok(changes);
        }

        let position = PackedPosition::group(group);
        if self.mode.is_single() {
            self.check_exclusively(source, position, checked, &mut changes);
        } else {
            self.apply(source, position, checked, &mut changes);
            for child in 0..source.child_count(group) {
                self.apply(source, PackedPosition::child(group, child), checked, &mut changes);
            }
        }
        Ok(changes)
    }

    fn check_exclusively(
        &mut self,
        source: &dyn ExpandableSource,
        position: PackedPosition,
        checked: bool,
        changes: &mut Vec<CheckChange>,
    ) {
        if checked {
            for other in self.store.checked_positions(source) {
                if other != position {
                    self.apply(source, other, false, changes);
                }
            }
            // Checks on items outside the visible data are dropped silently.
            let already = self.store.is_checked(position, source);
            if self.store.checked_count() > usize::from(already) {
                self.store.clear();
                if already {
                    self.store.set_checked(position, true, source);
                }
            }
        }
        self.apply(source, position, checked, changes);
    }

    fn reconcile_group(&mut self, source: &dyn ExpandableSource, group: usize, changes: &mut Vec<CheckChange>) {
        let count = source.child_count(group);
        let all_checked = count > 0
            && (0..count).all(|child| self.store.is_checked(PackedPosition::child(group, child), source));
        self.apply(source, PackedPosition::group(group), all_checked, changes);
    }

    fn apply(
        &mut self,
        source: &dyn ExpandableSource,
        position: PackedPosition,
        checked: bool,
        changes: &mut Vec<CheckChange>,
    ) {
        if self.store.set_checked(position, checked, source) {
            let group = position.group_position();
            let id = match position.child_position() {
                Some(child) => source.child_id(group, child),
                None => source.group_id(group),
            };
            changes.push(CheckChange {
                position,
                id,
                checked,
            });
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Whether a lifecycle should start now.
    pub fn wants_lifecycle(&self) -> bool {
        self.mode.is_modal() && !matches!(self.lifecycle, Lifecycle::Active(_)) && self.checked_count() > 0
    }

    /// Records that a start was requested but could not run yet.
    pub fn mark_pending(&mut self) {
        if self.lifecycle == Lifecycle::Inactive {
            self.lifecycle = Lifecycle::Pending;
        }
    }

    /// Opens a new session and marks it active.
    pub fn activate(&mut self) -> ActionMode {
        self.sessions += 1;
        let mode = ActionMode::new(self.sessions);
        self.lifecycle = Lifecycle::Active(mode);
        mode
    }

    /// Rolls back `mode` if it is still the active session.
    pub fn abort(&mut self, mode: ActionMode) {
        if self.lifecycle == Lifecycle::Active(mode) {
            self.lifecycle = Lifecycle::Inactive;
        }
    }

    /// The running session, if any.
    pub fn active_mode(&self) -> Option<ActionMode> {
        match self.lifecycle {
            Lifecycle::Active(mode) => Some(mode),
            _ => None,
        }
    }

    /// Ends any open lifecycle and clears every check.
    ///
    /// Returns the phase that was ended; `Inactive` means nothing happened.
    /// Only one caller can observe a given session ending.
    pub fn end_lifecycle(&mut self) -> Lifecycle {
        let ended = std::mem::take(&mut self.lifecycle);
        if ended.is_open() {
            self.store.clear();
        }
        ended
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Captures mode, lifecycle flag and checked sets.
    pub fn save(&self) -> SavedSelection {
        let mut saved = SavedSelection {
            mode: self.mode,
            lifecycle_active: self.lifecycle.is_open(),
            ..SavedSelection::default()
        };
        self.store.save(&mut saved);
        saved
    }

    /// Fails if `saved` cannot be restored into this state.
    pub fn check_restorable(&self, saved: &SavedSelection) -> AdapterResult<()> {
        if saved.store != self.store.kind() {
            return Err(AdapterError::InvalidSavedState(format!(
                "saved by a {:?} store, adapter uses a {:?} store",
                saved.store,
                self.store.kind()
            )));
        }
        Ok(())
    }

    /// Restores mode and checked sets. The lifecycle is left inactive.
    pub fn restore(&mut self, saved: &SavedSelection) -> AdapterResult<()> {
        self.check_restorable(saved)?;
        self.store.restore(saved)?;
        self.mode = saved.mode;
        self.lifecycle = Lifecycle::Inactive;
        Ok(())
    }
}

fn check_group(source: &dyn ExpandableSource, group: usize) -> AdapterResult<()> {
    let len = source.group_count();
    if group < len {
        Ok(())
    } else {
        Err(AdapterError::GroupOutOfBounds { group, len })
    }
}

fn check_child(source: &dyn ExpandableSource, group: usize, child: usize) -> AdapterResult<()> {
    check_group(source, group)?;
    let len = source.child_count(group);
    if child < len {
        Ok(())
    } else {
        Err(AdapterError::ChildOutOfBounds { group, child, len })
    }
}
