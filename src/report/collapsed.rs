//! Build collapsed stack format from a walked call tree.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "parent;child;grandchild weight"
//!
//! Example: "main;f;g 12"
//! This means: 12 samples landed in g while called from f, called from main.

use super::schema::{HotPath, NodeReport};
use log::debug;
use std::borrow::Cow;

/// Name used in stacks for frames without a function name
pub const ANONYMOUS_FRAME: &str = "(anonymous)";

/// A single collapsed stack entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string
    pub stack: String,

    /// Weight (self hits of the innermost frame)
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Render as one line of collapsed stack text
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Build collapsed stacks from a walked tree
///
/// The root itself is left out of every path; hits on the root are
/// reported under its own name. A `;` inside a frame name becomes `:`.
/// Paths that collapse to the same string (e.g. two anonymous siblings)
/// are summed.
///
/// # Returns
/// One stack per path with hits, sorted by weight (descending)
pub fn build_collapsed_stacks(root: &NodeReport) -> Vec<CollapsedStack> {
    let mut stacks: Vec<CollapsedStack> = Vec::new();

    if root.hits > 0 {
        stacks.push(CollapsedStack::new(frame_label(root).into_owned(), u64::from(root.hits)));
    }

    // Explicit stack of (node, depth below root) instead of recursion
    let mut pending: Vec<(&NodeReport, usize)> =
        root.children.iter().rev().map(|child| (child, 0)).collect();
    let mut path: Vec<Cow<'_, str>> = Vec::new();
    while let Some((node, depth)) = pending.pop() {
        path.truncate(depth);
        path.push(frame_label(node));
        if node.hits > 0 {
            stacks.push(CollapsedStack::new(path.join(";"), u64::from(node.hits)));
        }
        pending.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }

    // Merge equal paths
    stacks.sort_by(|a, b| a.stack.cmp(&b.stack));
    stacks.dedup_by(|later, earlier| {
        if later.stack == earlier.stack {
            earlier.weight += later.weight;
            true
        } else {
            false
        }
    });
    stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));

    debug!("Built {} collapsed stacks", stacks.len());
    stacks
}

/// Frame name as it appears in a stack. `;` separates frames, so it is
/// replaced inside names.
fn frame_label(node: &NodeReport) -> Cow<'_, str> {
    if node.name.is_empty() {
        Cow::Borrowed(ANONYMOUS_FRAME)
    } else if node.name.contains(';') {
        Cow::Owned(node.name.replace(';', ":"))
    } else {
        Cow::Borrowed(node.name.as_str())
    }
}

/// Calculate hot paths from collapsed stacks
///
/// # Arguments
/// * `stacks` - Collapsed stacks, sorted by weight
/// * `total_hits` - Total hits of the profile
/// * `top_n` - Number of top paths to return
pub fn calculate_hot_paths(stacks: &[CollapsedStack], total_hits: u64, top_n: usize) -> Vec<HotPath> {
    debug!("Calculating top {} hot paths from {} stacks", top_n, stacks.len());

    stacks
        .iter()
        .take(top_n)
        .map(|stack| create_hot_path(stack, total_hits))
        .collect()
}

/// Create a HotPath from a CollapsedStack
pub fn create_hot_path(stack: &CollapsedStack, total_hits: u64) -> HotPath {
    let percentage = if total_hits > 0 {
        (stack.weight as f64 / total_hits as f64) * 100.0
    } else {
        0.0
    };

    HotPath {
        stack: stack.stack.clone(),
        hits: stack.weight,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, hits: u32, children: Vec<NodeReport>) -> NodeReport {
        NodeReport {
            name: name.to_string(),
            resource_name: String::new(),
            line: 1,
            column: 1,
            hits,
            hit_lines: vec![],
            children,
        }
    }

    #[test]
    fn test_collapsed_stack_to_line() {
        let stack = CollapsedStack::new("main;f;g".to_string(), 12);
        assert_eq!(stack.to_line(), "main;f;g 12");
    }

    #[test]
    fn test_build_collapsed_stacks() {
        let root = node(
            "(root)",
            1,
            vec![node(
                "main",
                0,
                vec![node("f", 2, vec![node("g", 5, vec![])]), node("", 1, vec![]), node("", 2, vec![])],
            )],
        );

        let stacks = build_collapsed_stacks(&root);
        assert_eq!(
            stacks,
            vec![
                CollapsedStack::new("main;f;g".to_string(), 5),
                CollapsedStack::new("main;(anonymous)".to_string(), 3),
                CollapsedStack::new("main;f".to_string(), 2),
                CollapsedStack::new("(root)".to_string(), 1),
            ]
        );

        let total: u64 = stacks.iter().map(|s| s.weight).sum();
        assert_eq!(total, root.total_hits());
    }

    #[test]
    fn test_separator_in_frame_name() {
        let root = node("(root)", 0, vec![node("a;b", 0, vec![node("c", 4, vec![])])]);

        let stacks = build_collapsed_stacks(&root);
        assert_eq!(stacks, vec![CollapsedStack::new("a:b;c".to_string(), 4)]);
        assert_eq!(stacks[0].stack.split(';').count(), 2);
    }

    #[test]
    fn test_calculate_hot_paths() {
        let stacks = vec![
            CollapsedStack::new("main;f".to_string(), 50),
            CollapsedStack::new("main;g".to_string(), 30),
            CollapsedStack::new("main".to_string(), 20),
        ];

        let hot_paths = calculate_hot_paths(&stacks, 100, 2);
        assert_eq!(hot_paths.len(), 2);
        assert_eq!(hot_paths[0].stack, "main;f");
        assert_eq!(hot_paths[0].percentage, 50.0);
    }

    #[test]
    fn test_hot_path_with_no_hits() {
        let stack = CollapsedStack::new("main".to_string(), 0);
        assert_eq!(create_hot_path(&stack, 0).percentage, 0.0);
    }
}
