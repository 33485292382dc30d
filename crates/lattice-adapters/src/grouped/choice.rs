//! Selection, the modal action lifecycle and the rendering surface of a
//! grouped adapter.
//!
//! Locks are taken in one order: selection, then data. The surface binding
//! and the listener slot are only ever locked on their own, and no lock is
//! held while the listener or the surface is called.

use std::sync::Arc;

use tracing::debug;

use lattice_adapters_core::logging::targets;

use super::adapter::{GroupedAdapter, GroupedView};
use super::data::GroupKey;
use crate::error::{AdapterError, AdapterResult};
use crate::selection::{
    CheckChange, CheckStoreKind, CheckedId, ChoiceMode, Lifecycle, MultiChoiceListener, PackedPosition,
    SavedSelection,
};
use crate::surface::{DeferredAction, RenderingSurface};

impl<K: GroupKey, C: Send + Sync + 'static> GroupedAdapter<K, C> {
    fn listener(&self) -> Option<Arc<dyn MultiChoiceListener>> {
        self.listener.read().clone()
    }

    fn live_surface(&self) -> Option<Arc<dyn RenderingSurface>> {
        self.surface.lock().live()
    }

    fn refresh_surface(&self) {
        if let Some(surface) = self.live_surface() {
            surface.refresh_checked_states();
        }
    }

    fn is_checked_at(&self, position: PackedPosition) -> bool {
        let selection = self.selection.lock();
        self.store
            .read(|s| selection.is_checked(position, &GroupedView::new(s.visible(), self.ids.as_ref())))
    }

    // =========================================================================
    // Mode and queries
    // =========================================================================

    /// Sets the listener driven by the modal choice modes.
    pub fn set_multi_choice_listener<L: MultiChoiceListener + 'static>(&self, listener: Arc<L>) {
        *self.listener.write() = Some(listener);
    }

    /// The current choice mode.
    pub fn choice_mode(&self) -> ChoiceMode {
        self.selection.lock().mode()
    }

    /// Switches the choice mode, ending any open lifecycle and clearing every
    /// check.
    ///
    /// Modal modes need a listener; without one this returns
    /// [`AdapterError::MissingChoiceListener`] and nothing changes.
    pub fn set_choice_mode(&self, mode: ChoiceMode) -> AdapterResult<()> {
        if mode.is_modal() && self.listener().is_none() {
            return Err(AdapterError::MissingChoiceListener(mode));
        }
        self.end_lifecycle();
        self.selection.lock().set_mode(mode);
        debug!(target: targets::SELECTION, ?mode, "choice mode set");
        self.refresh_surface();
        Ok(())
    }

    /// How checked state is keyed: by id with stable ids, by position otherwise.
    pub fn check_store_kind(&self) -> CheckStoreKind {
        self.selection.lock().store_kind()
    }

    /// Phase of the modal action lifecycle.
    pub fn lifecycle(&self) -> Lifecycle {
        self.selection.lock().lifecycle()
    }

    /// Number of checked groups and children.
    pub fn checked_count(&self) -> usize {
        self.selection.lock().checked_count()
    }

    /// Whether the visible group at `group` is checked.
    pub fn is_group_checked(&self, group: usize) -> bool {
        self.is_checked_at(PackedPosition::group(group))
    }

    /// Whether the visible child at (`group`, `child`) is checked.
    pub fn is_child_checked(&self, group: usize, child: usize) -> bool {
        self.is_checked_at(PackedPosition::child(group, child))
    }

    /// Visible positions of everything checked, in packed order.
    pub fn checked_positions(&self) -> Vec<PackedPosition> {
        let selection = self.selection.lock();
        self.store
            .read(|s| selection.checked_positions(&GroupedView::new(s.visible(), self.ids.as_ref())))
    }

    /// Ids of everything checked. Empty unless the adapter has stable ids.
    pub fn checked_ids(&self) -> Vec<CheckedId> {
        self.selection.lock().checked_ids()
    }

    /// Unchecks everything. An open lifecycle ends.
    pub fn clear_choices(&self) {
        if !self.end_lifecycle() {
            self.selection.lock().clear();
            self.refresh_surface();
        }
    }

    // =========================================================================
    // Checking
    // =========================================================================

    /// Checks or unchecks the visible child at (`group`, `child`).
    ///
    /// In multiple modes the parent group is then reconciled: it is checked
    /// exactly when every one of its children is.
    pub fn set_child_checked(&self, group: usize, child: usize, checked: bool) -> AdapterResult<()> {
        let changes = {
            let mut selection = self.selection.lock();
            self.store.read(|s| {
                let view = GroupedView::new(s.visible(), self.ids.as_ref());
                selection.set_child_checked(&view, group, child, checked)
            })?
        };
        self.after_check_change(changes);
        Ok(())
    }

    /// Checks or unchecks the visible group at `group`. In multiple modes
    /// every child of the group follows.
    pub fn set_group_checked(&self, group: usize, checked: bool) -> AdapterResult<()> {
        let changes = {
            let mut selection = self.selection.lock();
            self.store.read(|s| {
                let view = GroupedView::new(s.visible(), self.ids.as_ref());
                selection.set_group_checked(&view, group, checked)
            })?
        };
        self.after_check_change(changes);
        Ok(())
    }

    fn after_check_change(&self, changes: Vec<CheckChange>) {
        if changes.is_empty() {
            return;
        }

        let start = self.selection.lock().wants_lifecycle() && changes.iter().any(|change| change.checked);
        if start {
            self.start_lifecycle();
        }

        let active = self.selection.lock().active_mode();
        if let Some(mode) = active
            && let Some(listener) = self.listener()
        {
            for change in &changes {
                let group = change.position.group_position();
                match change.position.child_position() {
                    Some(child) => {
                        listener.on_child_checked_state_changed(&mode, group, child, change.id, change.checked)
                    }
                    None => listener.on_group_checked_state_changed(&mode, group, change.id, change.checked),
                }
            }
        }

        let drained = {
            let selection = self.selection.lock();
            selection.checked_count() == 0 && selection.lifecycle().is_open()
        };
        if drained {
            debug!(target: targets::SELECTION, "last check removed");
            self.end_lifecycle();
        }

        self.refresh_surface();
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn start_lifecycle(&self) {
        let surface = self.surface.lock().run_or_defer(DeferredAction::StartLifecycle);
        let Some(surface) = surface else {
            self.selection.lock().mark_pending();
            return;
        };

        let mode = {
            let mut selection = self.selection.lock();
            if !selection.wants_lifecycle() {
                return;
            }
            selection.activate()
        };
        debug!(target: targets::SELECTION, session = mode.session(), "action lifecycle started");
        surface.start_action_mode();

        let listener = self.listener();
        let created = listener
            .as_ref()
            .is_none_or(|listener| listener.on_create_action_mode(&mode));
        if !created {
            debug!(target: targets::SELECTION, session = mode.session(), "action lifecycle refused by listener");
            self.selection.lock().abort(mode);
            surface.finish_action_mode();
            return;
        }
        if let Some(listener) = listener {
            listener.on_prepare_action_mode(&mode);
        }
    }

    /// Ends any open lifecycle. Returns `false` if there was none.
    fn end_lifecycle(&self) -> bool {
        let ended = self.selection.lock().end_lifecycle();
        match ended {
            Lifecycle::Inactive => false,
            Lifecycle::Pending => {
                self.surface.lock().cancel(DeferredAction::StartLifecycle);
                true
            }
            Lifecycle::Active(mode) => {
                debug!(target: targets::SELECTION, session = mode.session(), "action lifecycle ended");
                if let Some(listener) = self.listener() {
                    listener.on_destroy_action_mode(&mode);
                }
                if let Some(surface) = self.live_surface() {
                    surface.finish_action_mode();
                    surface.refresh_checked_states();
                }
                true
            }
        }
    }

    /// Ends the modal lifecycle and clears every check.
    ///
    /// Returns `false` if no lifecycle was open.
    pub fn finish_action_mode(&self) -> bool {
        self.end_lifecycle()
    }

    /// Forwards an action-bar click to the listener while a lifecycle runs.
    pub fn action_item_clicked(&self, item_id: u32) -> bool {
        let Some(mode) = self.selection.lock().active_mode() else {
            return false;
        };
        self.listener()
            .is_some_and(|listener| listener.on_action_item_clicked(&mode, item_id))
    }

    // =========================================================================
    // Taps from the rendering side
    // =========================================================================

    /// Whether a plain tap should toggle checks right now.
    fn taps_toggle(&self) -> bool {
        let selection = self.selection.lock();
        let mode = selection.mode();
        mode.is_enabled() && (!mode.is_modal() || selection.active_mode().is_some())
    }

    /// Whether a long press should open the lifecycle right now.
    fn long_press_starts(&self) -> bool {
        let selection = self.selection.lock();
        selection.mode().is_modal() && selection.active_mode().is_none()
    }

    /// Handles a tap on a child row. Returns whether the tap was consumed.
    ///
    /// Toggles the child in the non-modal modes, and in the modal modes only
    /// while the lifecycle is running.
    pub fn on_child_click(&self, group: usize, child: usize) -> AdapterResult<bool> {
        if !self.taps_toggle() {
            return Ok(false);
        }
        let checked = !self.is_child_checked(group, child);
        self.set_child_checked(group, child, checked)?;
        Ok(true)
    }

    /// Handles a tap on a group header. Returns whether the tap was consumed.
    pub fn on_group_click(&self, group: usize) -> AdapterResult<bool> {
        if !self.taps_toggle() {
            return Ok(false);
        }
        let checked = !self.is_group_checked(group);
        self.set_group_checked(group, checked)?;
        Ok(true)
    }

    /// Handles a long press on a child row: in a modal mode with no running
    /// lifecycle, checks the child, which starts one.
    pub fn on_child_long_click(&self, group: usize, child: usize) -> AdapterResult<bool> {
        if !self.long_press_starts() {
            return Ok(false);
        }
        self.set_child_checked(group, child, true)?;
        Ok(true)
    }

    /// Handles a long press on a group header.
    pub fn on_group_long_click(&self, group: usize) -> AdapterResult<bool> {
        if !self.long_press_starts() {
            return Ok(false);
        }
        self.set_group_checked(group, true)?;
        Ok(true)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Captures mode, lifecycle flag and checked sets.
    pub fn save_selection_state(&self) -> SavedSelection {
        self.selection.lock().save()
    }

    /// Restores a captured selection, reopening the lifecycle if it was open.
    ///
    /// Fails without changing anything if the state was saved by the other
    /// kind of check store, or names a modal mode while no listener is set.
    pub fn restore_selection_state(&self, saved: &SavedSelection) -> AdapterResult<()> {
        self.selection.lock().check_restorable(saved)?;
        if saved.mode.is_modal() && self.listener().is_none() {
            return Err(AdapterError::MissingChoiceListener(saved.mode));
        }

        self.end_lifecycle();
        self.selection.lock().restore(saved)?;
        debug!(
            target: targets::SELECTION,
            mode = ?saved.mode,
            checked = saved.checked_count(),
            "selection restored"
        );

        let reopen = saved.lifecycle_active && self.selection.lock().wants_lifecycle();
        if reopen {
            self.start_lifecycle();
        }
        self.refresh_surface();
        Ok(())
    }

    // =========================================================================
    // Rendering surface
    // =========================================================================

    /// Attaches the surface and replays whatever was deferred while detached.
    pub fn attach_surface(&self, surface: &Arc<dyn RenderingSurface>) {
        let deferred = self.surface.lock().attach(surface);
        for action in deferred {
            match action {
                DeferredAction::ExpandAll => {
                    for group in 0..self.group_count() {
                        surface.expand_group(group);
                    }
                }
                DeferredAction::CollapseAll => {
                    for group in 0..self.group_count() {
                        surface.collapse_group(group);
                    }
                }
                DeferredAction::StartLifecycle => {
                    let pending = {
                        let selection = self.selection.lock();
                        selection.lifecycle() == Lifecycle::Pending && selection.wants_lifecycle()
                    };
                    if pending {
                        self.start_lifecycle();
                    }
                }
            }
        }
        surface.refresh_checked_states();
    }

    /// Drops the surface. Later surface work is queued until the next attach.
    pub fn detach_surface(&self) {
        self.surface.lock().detach();
    }

    /// Whether a live surface is attached.
    pub fn is_surface_attached(&self) -> bool {
        self.surface.lock().is_attached()
    }

    /// Surface actions waiting for an attach.
    pub fn deferred_actions(&self) -> Vec<DeferredAction> {
        self.surface.lock().pending().to_vec()
    }

    /// Expands every visible group, or queues the request while detached.
    pub fn expand_all(&self) {
        let surface = self.surface.lock().run_or_defer(DeferredAction::ExpandAll);
        if let Some(surface) = surface {
            for group in 0..self.group_count() {
                surface.expand_group(group);
            }
        }
    }

    /// Collapses every visible group, or queues the request while detached.
    pub fn collapse_all(&self) {
        let surface = self.surface.lock().run_or_defer(DeferredAction::CollapseAll);
        if let Some(surface) = surface {
            for group in 0..self.group_count() {
                surface.collapse_group(group);
            }
        }
    }

    /// Expands one group. Returns `false` while detached or if it was
    /// already expanded.
    pub fn expand_group(&self, group: usize) -> AdapterResult<bool> {
        self.group(group)?;
        Ok(self.live_surface().is_some_and(|surface| surface.expand_group(group)))
    }

    /// Collapses one group. Returns `false` while detached or if it was
    /// already collapsed.
    pub fn collapse_group(&self, group: usize) -> AdapterResult<bool> {
        self.group(group)?;
        Ok(self.live_surface().is_some_and(|surface| surface.collapse_group(group)))
    }
}
