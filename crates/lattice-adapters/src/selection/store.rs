//! Checked-state storage.
//!
//! Two interchangeable stores sit behind [`CheckStore`]. Adapters without
//! stable ids key checks by packed position, so a check stays on a position
//! when items move. Adapters with stable ids key checks by id, so a check
//! follows its item through reordering and filtering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::packed::PackedPosition;
use super::saved::{SavedId, SavedSelection};
use super::source::ExpandableSource;
use crate::error::{AdapterError, AdapterResult};

/// Which store an adapter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStoreKind {
    #[default]
    Position,
    Id,
}

/// Stable identity of a checked group or child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckedId {
    Group { id: u64 },
    Child { group: u64, child: u64 },
}

impl CheckedId {
    /// Id of the item at `position` in `source`.
    pub fn at(position: PackedPosition, source: &dyn ExpandableSource) -> Self {
        let group = position.group_position();
        match position.child_position() {
            Some(child) => CheckedId::Child {
                group: source.group_id(group),
                child: source.child_id(group, child),
            },
            None => CheckedId::Group {
                id: source.group_id(group),
            },
        }
    }
}

/// Storage for checked groups and children.
pub trait CheckStore: fmt::Debug + Send {
    /// Which implementation this is.
    fn kind(&self) -> CheckStoreKind;

    /// Whether the item at `position` is checked.
    fn is_checked(&self, position: PackedPosition, source: &dyn ExpandableSource) -> bool;

    /// Sets the checked state of the item at `position`. Returns whether it changed.
    fn set_checked(
        &mut self,
        position: PackedPosition,
        checked: bool,
        source: &dyn ExpandableSource,
    ) -> bool;

    /// Number of checked entries, groups included.
    fn checked_count(&self) -> usize;

    /// Visible positions of checked items, in packed order.
    fn checked_positions(&self, source: &dyn ExpandableSource) -> Vec<PackedPosition>;

    /// Ids of checked items. Empty for position-keyed stores.
    fn checked_ids(&self) -> Vec<CheckedId>;

    /// Unchecks everything.
    fn clear(&mut self);

    /// Writes the checked sets into `saved`.
    fn save(&self, saved: &mut SavedSelection);

    /// Replaces the checked sets with those in `saved`.
    fn restore(&mut self, saved: &SavedSelection) -> AdapterResult<()>;
}

fn check_kind(expected: CheckStoreKind, saved: &SavedSelection) -> AdapterResult<()> {
    if saved.store == expected {
        Ok(())
    } else {
        Err(AdapterError::InvalidSavedState(format!(
            "saved by a {:?} store, restoring into a {expected:?} store",
            saved.store
        )))
    }
}

/// Checks keyed by packed position.
#[derive(Debug, Default)]
pub struct PositionCheckStore {
    checked: BTreeSet<PackedPosition>,
}

impl PositionCheckStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckStore for PositionCheckStore {
    fn kind(&self) -> CheckStoreKind {
        CheckStoreKind::Position
    }

    fn is_checked(&self, position: PackedPosition, _source: &dyn ExpandableSource) -> bool {
        self.checked.contains(&position)
    }

    fn set_checked(
        &mut self,
        position: PackedPosition,
        checked: bool,
        _source: &dyn ExpandableSource,
    ) -> bool {
        if checked {
            self.checked.insert(position)
        } else {
            self.checked.remove(&position)
        }
    }

    fn checked_count(&self) -> usize {
        self.checked.len()
    }

    fn checked_positions(&self, _source: &dyn ExpandableSource) -> Vec<PackedPosition> {
        self.checked.iter().copied().collect()
    }

    fn checked_ids(&self) -> Vec<CheckedId> {
        Vec::new()
    }

    fn clear(&mut self) {
        self.checked.clear();
    }

    fn save(&self, saved: &mut SavedSelection) {
        saved.store = CheckStoreKind::Position;
        saved.positions = self.checked.iter().copied().collect();
    }

    fn restore(&mut self, saved: &SavedSelection) -> AdapterResult<()> {
        check_kind(CheckStoreKind::Position, saved)?;
        self.checked = saved.positions.iter().copied().collect();
        Ok(())
    }
}

/// Checks keyed by stable id, remembering where each id was last seen.
#[derive(Debug, Default)]
pub struct IdCheckStore {
    checked: BTreeMap<CheckedId, PackedPosition>,
}

impl IdCheckStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locate(&self, id: CheckedId, hint: PackedPosition, source: &dyn ExpandableSource) -> Option<PackedPosition> {
        if in_range(hint, source) && CheckedId::at(hint, source) == id {
            return Some(hint);
        }
        (0..source.group_count()).find_map(|group| match id {
            CheckedId::Group { id } => (source.group_id(group) == id).then(|| PackedPosition::group(group)),
            CheckedId::Child { group: gid, child: cid } => {
                if source.group_id(group) != gid {
                    return None;
                }
                (0..source.child_count(group))
                    .find(|&child| source.child_id(group, child) == cid)
                    .map(|child| PackedPosition::child(group, child))
            }
        })
    }
}

fn in_range(position: PackedPosition, source: &dyn ExpandableSource) -> bool {
    let group = position.group_position();
    if group >= source.group_count() {
        return false;
    }
    position
        .child_position()
        .is_none_or(|child| child < source.child_count(group))
}

impl CheckStore for IdCheckStore {
    fn kind(&self) -> CheckStoreKind {
        CheckStoreKind::Id
    }

    fn is_checked(&self, position: PackedPosition, source: &dyn ExpandableSource) -> bool {
        in_range(position, source) && self.checked.contains_key(&CheckedId::at(position, source))
    }

    fn set_checked(
        &mut self,
        position: PackedPosition,
        checked: bool,
        source: &dyn ExpandableSource,
    ) -> bool {
        let id = CheckedId::at(position, source);
        if checked {
            self.checked.insert(id, position).is_none()
        } else {
            self.checked.remove(&id).is_some()
        }
    }

    fn checked_count(&self) -> usize {
        self.checked.len()
    }

    fn checked_positions(&self, source: &dyn ExpandableSource) -> Vec<PackedPosition> {
        let mut positions: Vec<PackedPosition> = self
            .checked
            .iter()
            .filter_map(|(id, hint)| self.locate(*id, *hint, source))
            .collect();
        positions.sort();
        positions
    }

    fn checked_ids(&self) -> Vec<CheckedId> {
        self.checked.keys().copied().collect()
    }

    fn clear(&mut self) {
        self.checked.clear();
    }

    fn save(&self, saved: &mut SavedSelection) {
        saved.store = CheckStoreKind::Id;
        saved.ids = self
            .checked
            .iter()
            .map(|(id, position)| SavedId {
                id: *id,
                position: *position,
            })
            .collect();
    }

    fn restore(&mut self, saved: &SavedSelection) -> AdapterResult<()> {
        check_kind(CheckStoreKind::Id, saved)?;
        self.checked = saved.ids.iter().map(|s| (s.id, s.position)).collect();
        Ok(())
    }
}

/// Creates the store matching an adapter's id capability.
pub fn store_for(stable_ids: bool) -> Box<dyn CheckStore> {
    if stable_ids {
        Box::new(IdCheckStore::new())
    } else {
        Box::new(PositionCheckStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::source::fixture::Shape;

    #[test]
    fn test_position_store() {
        let shape = Shape::new(&[2, 1]);
        let mut store = PositionCheckStore::new();

        assert!(store.set_checked(PackedPosition::child(0, 1), true, &shape));
        assert!(!store.set_checked(PackedPosition::child(0, 1), true, &shape));
        assert!(store.is_checked(PackedPosition::child(0, 1), &shape));
        assert_eq!(store.checked_count(), 1);
        assert!(store.checked_ids().is_empty());

        assert!(store.set_checked(PackedPosition::child(0, 1), false, &shape));
        assert_eq!(store.checked_count(), 0);
    }

    #[test]
    fn test_id_store_follows_items() {
        let mut shape = Shape::new(&[2, 1]);
        shape.stable = true;
        let mut store = IdCheckStore::new();

        store.set_checked(PackedPosition::group(1), true, &shape);
        store.set_checked(PackedPosition::child(1, 0), true, &shape);
        assert_eq!(
            store.checked_ids(),
            vec![CheckedId::Group { id: 1 }, CheckedId::Child { group: 1, child: 100 }]
        );

        // Group 1 moves to position 0 once a group ahead of it disappears.
        let mut moved = Shape::new(&[1]);
        moved.id_offset = 1;
        assert!(store.is_checked(PackedPosition::group(0), &moved));
        assert_eq!(
            store.checked_positions(&moved),
            vec![PackedPosition::group(0), PackedPosition::child(0, 0)]
        );
    }

    #[test]
    fn test_id_store_recheck_moves_hint() {
        let mut shape = Shape::new(&[2, 1]);
        shape.stable = true;
        let mut store = IdCheckStore::new();
        assert!(store.set_checked(PackedPosition::group(1), true, &shape));

        let mut moved = Shape::new(&[1]);
        moved.id_offset = 1;
        // Same id, already checked: no change reported, but the hint follows.
        assert!(!store.set_checked(PackedPosition::group(0), true, &moved));

        let mut saved = SavedSelection::default();
        store.save(&mut saved);
        assert_eq!(
            saved.ids,
            vec![SavedId {
                id: CheckedId::Group { id: 1 },
                position: PackedPosition::group(0),
            }]
        );
    }

    #[test]
    fn test_save_restore_rejects_other_kind() {
        let shape = Shape::new(&[1]);
        let mut positions = PositionCheckStore::new();
        positions.set_checked(PackedPosition::child(0, 0), true, &shape);

        let mut saved = SavedSelection::default();
        positions.save(&mut saved);

        let mut ids = IdCheckStore::new();
        assert!(matches!(ids.restore(&saved), Err(AdapterError::InvalidSavedState(_))));

        let mut restored = PositionCheckStore::new();
        restored.restore(&saved).unwrap();
        assert!(restored.is_checked(PackedPosition::child(0, 0), &shape));
    }
}
