//! Packed (group, child) positions.

use std::fmt;

use serde::{Deserialize, Serialize};

const CHILD_FLAG: u64 = 1 << 63;
const GROUP_MASK: u64 = 0x7FFF_FFFF;
const CHILD_MASK: u64 = 0xFFFF_FFFF;
const GROUP_SHIFT: u32 = 32;

/// A group or child position encoded in one `u64`.
///
/// Bit 63 marks a child, bits 32..63 hold the group position and the low 32
/// bits hold the child position. Group positions are limited to 31 bits and
/// child positions to 32 bits; larger values are truncated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedPosition(u64);

impl PackedPosition {
    /// Position of a group header.
    pub fn group(group: usize) -> Self {
        Self((group as u64 & GROUP_MASK) << GROUP_SHIFT)
    }

    /// Position of a child row.
    pub fn child(group: usize, child: usize) -> Self {
        Self(CHILD_FLAG | ((group as u64 & GROUP_MASK) << GROUP_SHIFT) | (child as u64 & CHILD_MASK))
    }

    /// Reinterprets a raw packed value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw packed value.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is a child position.
    pub fn is_child(self) -> bool {
        self.0 & CHILD_FLAG != 0
    }

    /// The group position.
    pub fn group_position(self) -> usize {
        ((self.0 >> GROUP_SHIFT) & GROUP_MASK) as usize
    }

    /// The child position, if this is a child.
    pub fn child_position(self) -> Option<usize> {
        self.is_child().then(|| (self.0 & CHILD_MASK) as usize)
    }
}

impl fmt::Debug for PackedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.child_position() {
            Some(child) => write!(f, "Child({}, {child})", self.group_position()),
            None => write!(f, "Group({})", self.group_position()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_position() {
        let packed = PackedPosition::group(12);
        assert!(!packed.is_child());
        assert_eq!(packed.group_position(), 12);
        assert_eq!(packed.child_position(), None);
    }

    #[test]
    fn test_child_position() {
        let packed = PackedPosition::child(3, 70_000);
        assert!(packed.is_child());
        assert_eq!(packed.group_position(), 3);
        assert_eq!(packed.child_position(), Some(70_000));
        assert_eq!(PackedPosition::from_raw(packed.raw()), packed);
    }

    #[test]
    fn test_groups_sort_before_children() {
        assert!(PackedPosition::group(500) < PackedPosition::child(0, 0));
        assert!(PackedPosition::child(1, 9) < PackedPosition::child(2, 0));
        assert_eq!(format!("{:?}", PackedPosition::child(1, 2)), "Child(1, 2)");
    }
}
