//! Choice modes.

use serde::{Deserialize, Serialize};

/// How items can be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceMode {
    /// Checking is disabled.
    #[default]
    None,
    /// At most one item is checked.
    Single,
    /// Any number of items are checked; groups mirror their children.
    Multiple,
    /// Like `Single`, inside a contextual action lifecycle.
    SingleModal,
    /// Like `Multiple`, inside a contextual action lifecycle.
    MultipleModal,
}

impl ChoiceMode {
    /// Whether checks drive an action lifecycle.
    pub fn is_modal(self) -> bool {
        matches!(self, ChoiceMode::SingleModal | ChoiceMode::MultipleModal)
    }

    /// Whether several items may be checked at once.
    pub fn is_multiple(self) -> bool {
        matches!(self, ChoiceMode::Multiple | ChoiceMode::MultipleModal)
    }

    /// Whether at most one item may be checked.
    pub fn is_single(self) -> bool {
        matches!(self, ChoiceMode::Single | ChoiceMode::SingleModal)
    }

    /// Whether checking is enabled at all.
    pub fn is_enabled(self) -> bool {
        self != ChoiceMode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_classes() {
        assert!(!ChoiceMode::None.is_enabled());
        assert!(ChoiceMode::SingleModal.is_single());
        assert!(ChoiceMode::SingleModal.is_modal());
        assert!(ChoiceMode::Multiple.is_multiple());
        assert!(!ChoiceMode::Multiple.is_modal());
        assert_eq!(ChoiceMode::default(), ChoiceMode::None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ChoiceMode::MultipleModal).unwrap();
        assert_eq!(json, "\"multiple_modal\"");
        let mode: ChoiceMode = serde_json::from_str("\"single\"").unwrap();
        assert_eq!(mode, ChoiceMode::Single);
    }
}
