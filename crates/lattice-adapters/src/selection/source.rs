//! Read-only view of grouped data used by selection.

/// Shape and ids of the visible groups, as selection sees them.
pub trait ExpandableSource {
    /// Number of visible groups.
    fn group_count(&self) -> usize;

    /// Number of visible children in `group`, or 0 if `group` is out of range.
    fn child_count(&self, group: usize) -> usize;

    /// Id of `group`. Only meaningful for in-range positions.
    fn group_id(&self, group: usize) -> u64;

    /// Id of a child, unique within its group. Only meaningful for in-range positions.
    fn child_id(&self, group: usize, child: usize) -> u64;

    /// Whether ids survive reordering and filtering.
    fn has_stable_ids(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::ExpandableSource;

    /// Groups given as child counts, with ids derived from positions.
    pub(crate) struct Shape {
        pub(crate) children: Vec<usize>,
        pub(crate) id_offset: u64,
        pub(crate) stable: bool,
    }

    impl Shape {
        pub(crate) fn new(children: &[usize]) -> Self {
            Self {
                children: children.to_vec(),
                id_offset: 0,
                stable: false,
            }
        }
    }

    impl ExpandableSource for Shape {
        fn group_count(&self) -> usize {
            self.children.len()
        }

        fn child_count(&self, group: usize) -> usize {
            self.children.get(group).copied().unwrap_or(0)
        }

        fn group_id(&self, group: usize) -> u64 {
            group as u64 + self.id_offset
        }

        fn child_id(&self, _group: usize, child: usize) -> u64 {
            child as u64 + 100
        }

        fn has_stable_ids(&self) -> bool {
            self.stable
        }
    }
}
