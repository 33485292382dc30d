//! Rendering bridge: the callbacks an adapter hands items to.
//!
//! Adapters never build views themselves. The rendering side supplies a
//! renderer, asks for a position, and receives whatever view type the
//! renderer produces. The item is resolved under the adapter lock and the
//! renderer runs after the lock is released.

/// Renders one flat item.
///
/// Implemented for every `Fn(usize, &T) -> V`.
pub trait ItemRenderer<T: ?Sized> {
    /// The rendered output.
    type View;

    /// Renders `item`, which is at `position` in the visible collection.
    fn render(&self, position: usize, item: &T) -> Self::View;
}

impl<T: ?Sized, V, F> ItemRenderer<T> for F
where
    F: Fn(usize, &T) -> V,
{
    type View = V;

    fn render(&self, position: usize, item: &T) -> V {
        self(position, item)
    }
}

/// Renders group headers and child rows of a grouped adapter.
pub trait GroupRenderer<K, C> {
    /// The rendered output.
    type View;

    /// Renders the header of the group at `group`.
    fn render_group(&self, group: usize, key: &K, child_count: usize) -> Self::View;

    /// Renders one child row.
    fn render_child(&self, group: usize, child: usize, item: &C, is_last_child: bool) -> Self::View;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Labels;

    impl GroupRenderer<u32, String> for Labels {
        type View = String;

        fn render_group(&self, group: usize, key: &u32, child_count: usize) -> String {
            format!("#{group} {key} ({child_count})")
        }

        fn render_child(&self, _group: usize, child: usize, item: &String, is_last_child: bool) -> String {
            format!("{child}:{item}{}", if is_last_child { "." } else { "" })
        }
    }

    #[test]
    fn test_closure_renderer() {
        let renderer = |position: usize, item: &str| format!("{position}={item}");
        assert_eq!(renderer.render(2, "x"), "2=x");
    }

    #[test]
    fn test_group_renderer() {
        let labels = Labels;
        assert_eq!(labels.render_group(0, &2000, 2), "#0 2000 (2)");
        assert_eq!(labels.render_child(0, 1, &"B".to_string(), true), "1:B.");
    }
}
