//! Persisted selection state.

use serde::{Deserialize, Serialize};

use super::mode::ChoiceMode;
use super::packed::PackedPosition;
use super::store::{CheckStoreKind, CheckedId};
use crate::error::{AdapterError, AdapterResult};

/// A checked id together with the position it was last seen at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedId {
    pub id: CheckedId,
    pub position: PackedPosition,
}

/// Everything needed to restore selection after the adapter is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedSelection {
    /// The choice mode.
    pub mode: ChoiceMode,
    /// Whether a modal lifecycle was open.
    pub lifecycle_active: bool,
    /// Which store produced the checked sets.
    pub store: CheckStoreKind,
    /// Checked positions (position-keyed store).
    #[serde(default)]
    pub positions: Vec<PackedPosition>,
    /// Checked ids (id-keyed store).
    #[serde(default)]
    pub ids: Vec<SavedId>,
}

impl SavedSelection {
    /// Serializes to a JSON string.
    pub fn to_json(&self) -> AdapterResult<String> {
        serde_json::to_string(self).map_err(|e| AdapterError::InvalidSavedState(e.to_string()))
    }

    /// Parses a JSON string produced by [`SavedSelection::to_json`].
    pub fn from_json(json: &str) -> AdapterResult<Self> {
        serde_json::from_str(json).map_err(|e| AdapterError::InvalidSavedState(e.to_string()))
    }

    /// Total number of checked entries.
    pub fn checked_count(&self) -> usize {
        self.positions.len() + self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let saved = SavedSelection {
            mode: ChoiceMode::MultipleModal,
            lifecycle_active: true,
            store: CheckStoreKind::Id,
            positions: Vec::new(),
            ids: vec![SavedId {
                id: CheckedId::Child { group: 2000, child: 7 },
                position: PackedPosition::child(0, 1),
            }],
        };

        let json = saved.to_json().unwrap();
        assert_eq!(SavedSelection::from_json(&json).unwrap(), saved);
    }

    #[test]
    fn test_garbage_is_invalid_state() {
        assert!(matches!(
            SavedSelection::from_json("{\"mode\": 3}"),
            Err(AdapterError::InvalidSavedState(_))
        ));
    }
}
