//! Logging and debugging facilities for Lattice Adapters.
//!
//! This module provides:
//! - Integration with the `tracing` crate for structured logging
//! - A small tree formatter used to dump grouped adapter contents
//! - Performance tracing hooks for profiling filter passes
//!
//! # Tracing Integration
//!
//! Lattice Adapters uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!     // ...
//! }
//! ```
//!
//! Every subsystem logs under its own target (see [`targets`]), so a directive
//! such as `lattice_adapters::filter=debug` isolates filter activity.

use std::fmt::Write as FmtWrite;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "lattice_adapters_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "lattice_adapters_core::signal";
    /// Background thread pool target.
    pub const THREAD_POOL: &str = "lattice_adapters_core::threadpool";
    /// Snapshot store target.
    pub const SNAPSHOT: &str = "lattice_adapters::snapshot";
    /// Filter engine target.
    pub const FILTER: &str = "lattice_adapters::filter";
    /// Grouping engine target.
    pub const GROUPING: &str = "lattice_adapters::grouping";
    /// Selection state machine target.
    pub const SELECTION: &str = "lattice_adapters::selection";
    /// Rendering surface binding target.
    pub const SURFACE: &str = "lattice_adapters::surface";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Formats a two-level tree of labels (groups and their children).
///
/// ```
/// use lattice_adapters_core::logging::{TreeFormatter, TreeStyle};
///
/// let mut tree = TreeFormatter::new(TreeStyle::Ascii);
/// tree.node("2000", ["A", "B"]);
/// tree.node("2005", ["C"]);
/// let output = tree.finish();
/// assert!(output.contains("+-- 2000"));
/// assert!(output.contains("|   `-- B"));
/// ```
#[derive(Debug, Clone)]
pub struct TreeFormatter {
    style: TreeStyle,
    nodes: Vec<(String, Vec<String>)>,
}

impl TreeFormatter {
    /// Create an empty formatter.
    pub fn new(style: TreeStyle) -> Self {
        Self {
            style,
            nodes: Vec::new(),
        }
    }

    /// Append a top-level node with its leaf labels.
    pub fn node<L, I, C>(&mut self, label: L, children: I) -> &mut Self
    where
        L: ToString,
        I: IntoIterator<Item = C>,
        C: ToString,
    {
        self.nodes.push((
            label.to_string(),
            children.into_iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    /// Render the tree.
    pub fn finish(&self) -> String {
        let mut output = String::new();

        if self.style == TreeStyle::Compact {
            let parts: Vec<String> = self
                .nodes
                .iter()
                .map(|(label, children)| format!("{label}[{}]", children.join(", ")))
                .collect();
            output.push_str(&parts.join(" "));
            return output;
        }

        let (tee, corner, pipe) = match self.style {
            TreeStyle::Ascii => ("+--", "`--", "|"),
            _ => ("\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}", "\u{2502}"),
        };

        let node_count = self.nodes.len();
        for (i, (label, children)) in self.nodes.iter().enumerate() {
            let last_node = i + 1 == node_count;
            let _ = writeln!(output, "{} {label}", if last_node { corner } else { tee });

            let child_count = children.len();
            for (j, child) in children.iter().enumerate() {
                let indent = if last_node { " " } else { pipe };
                let branch = if j + 1 == child_count { corner } else { tee };
                let _ = writeln!(output, "{indent}   {branch} {child}");
            }
        }

        output
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "lattice_adapters::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_format_empty() {
        let tree = TreeFormatter::new(TreeStyle::Unicode);
        assert!(tree.finish().is_empty());
    }

    #[test]
    fn test_tree_format_unicode() {
        let mut tree = TreeFormatter::new(TreeStyle::Unicode);
        tree.node("fruit", ["apple", "pear"]).node("veg", ["leek"]);
        let output = tree.finish();

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("fruit"));
        assert!(lines[0].starts_with('\u{251c}'));
        assert!(lines[3].starts_with('\u{2514}'));
        assert!(lines[4].contains("leek"));
    }

    #[test]
    fn test_tree_format_compact() {
        let mut tree = TreeFormatter::new(TreeStyle::Compact);
        tree.node(2000, ["A", "B"]).node(2005, ["C"]);
        assert_eq!(tree.finish(), "2000[A, B] 2005[C]");
    }

    #[test]
    fn test_perf_span() {
        let _span = PerfSpan::new("test_operation");
    }
}
