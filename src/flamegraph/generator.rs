//! SVG flamegraph and text summary generation.
//!
//! Renders collapsed stacks as a classic bottom-up flamegraph:
//! - Root at the bottom, callees stacked above their callers
//! - Width proportional to total samples of the subtree
//! - Warm colors derived from the frame name so they stay stable across runs

use crate::report::collapsed::CollapsedStack;
use crate::utils::error::FlamegraphError;
use log::info;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "CPU Profile".to_string(),
            width: 1200,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}

/// One frame of the merged flamegraph tree
struct Node {
    name: String,
    value: u64,
    /// Child indices keyed by name, so siblings render in a stable order
    children: BTreeMap<String, usize>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            value: 0,
            children: BTreeMap::new(),
        }
    }
}

/// Arena of merged stacks; index 0 is the synthetic "all" root
struct FlameTree {
    nodes: Vec<Node>,
    max_depth: usize,
}

impl FlameTree {
    fn new() -> Self {
        Self {
            nodes: vec![Node::new("all".to_string())],
            max_depth: 0,
        }
    }

    fn insert(&mut self, stack: &[&str], value: u64) {
        let mut current = 0;
        self.nodes[current].value += value;
        for frame in stack {
            let next = match self.nodes[current].children.get(*frame) {
                Some(&index) => index,
                None => {
                    let index = self.nodes.len();
                    self.nodes.push(Node::new(frame.to_string()));
                    self.nodes[current].children.insert(frame.to_string(), index);
                    index
                }
            };
            self.nodes[next].value += value;
            current = next;
        }
        self.max_depth = self.max_depth.max(stack.len());
    }
}

const HEIGHT_PER_LEVEL: usize = 18;
const TITLE_MARGIN: usize = 30;

/// Generate SVG flamegraph from collapsed stacks
///
/// # Errors
/// * `FlamegraphError::EmptyStacks` - no stack carries any weight
pub fn generate_flamegraph(
    stacks: &[CollapsedStack],
    config: Option<&FlamegraphConfig>,
) -> Result<String, FlamegraphError> {
    if stacks.iter().all(|stack| stack.weight == 0) {
        return Err(FlamegraphError::EmptyStacks);
    }

    let config = config.cloned().unwrap_or_default();
    info!("Generating flamegraph with {} stacks", stacks.len());

    let mut tree = FlameTree::new();
    for stack in stacks {
        let stack_parts: Vec<&str> = stack.stack.split(';').collect();
        tree.insert(&stack_parts, stack.weight);
    }

    let max_depth = tree.max_depth;
    let width = config.width;
    let graph_height = (max_depth + 1) * HEIGHT_PER_LEVEL;
    let total_height = graph_height + TITLE_MARGIN + 10;

    let mut svg_content = String::new();
    let _ = write!(
        svg_content,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        width, total_height, width, total_height
    );
    svg_content.push_str(
        r#"<style>.func { font: 12px monospace; } .func:hover { stroke: black; stroke-width: 1; cursor: pointer; }</style>"#,
    );
    let _ = write!(
        svg_content,
        r#"<text x="{}" y="20" font-size="16" text-anchor="middle" font-weight="bold">{}</text>"#,
        width / 2,
        escape_xml(&config.title)
    );

    render_tree(&tree, width as f64, &mut svg_content, graph_height);

    svg_content.push_str("</svg>");

    info!("Flamegraph generated successfully ({} bytes)", svg_content.len());
    Ok(svg_content)
}

/// Stable warm color for a frame name
fn get_node_color(name: &str) -> String {
    let hash = name
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
    let red = 205 + (hash % 50);
    let green = (hash / 50) % 180;
    let blue = (hash / 9000) % 55;
    format!("rgb({}, {}, {})", red, green, blue)
}

/// Emit every visible frame, callers before callees
fn render_tree(tree: &FlameTree, width: f64, out: &mut String, graph_height: usize) {
    let total = tree.nodes[0].value.max(1);

    // (node index, level, x, width)
    let mut pending = vec![(0usize, 0usize, 0.0f64, width)];
    while let Some((index, level, x, w)) = pending.pop() {
        // Don't render invisible blocks
        if w < 0.5 {
            continue;
        }

        let node = &tree.nodes[index];
        render_frame(node, level, x, w, total, out, graph_height);

        let mut children = Vec::with_capacity(node.children.len());
        let mut current_x = x;
        for &child in node.children.values() {
            let child_w = (tree.nodes[child].value as f64 / node.value.max(1) as f64) * w;
            children.push((child, level + 1, current_x, child_w));
            current_x += child_w;
        }
        pending.extend(children.into_iter().rev());
    }
}

fn render_frame(
    node: &Node,
    level: usize,
    x: f64,
    w: f64,
    total: u64,
    out: &mut String,
    graph_height: usize,
) {
    let y = graph_height - ((level + 1) * HEIGHT_PER_LEVEL) + TITLE_MARGIN;
    let percentage = (node.value as f64 / total as f64) * 100.0;
    let name = escape_xml(&node.name);

    let _ = write!(
        out,
        r#"<rect x="{:.2}" y="{}" width="{:.2}" height="{}" fill="{}" class="func"><title>{} ({} samples, {:.2}%)</title></rect>"#,
        x,
        y,
        w,
        HEIGHT_PER_LEVEL - 1,
        get_node_color(&node.name),
        name,
        node.value,
        percentage
    );

    if w > 35.0 {
        let char_width = 7.0;
        let max_chars = (w / char_width) as usize;
        let display_name: String = if node.name.chars().count() > max_chars && max_chars > 3 {
            let truncated: String = node.name.chars().take(max_chars - 2).collect();
            format!("{}..", truncated)
        } else {
            node.name.clone()
        };

        if !display_name.is_empty() {
            let _ = write!(
                out,
                r#"<text x="{:.2}" y="{}" dx="3" dy="13" font-size="12" pointer-events="none">{}</text>"#,
                x,
                y,
                escape_xml(&display_name)
            );
        }
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Create a text summary of the hottest stacks
pub fn generate_text_summary(stacks: &[CollapsedStack], max_lines: usize, total_hits: u64) -> String {
    let mut lines = Vec::new();

    lines.push("  HOT STACKS".to_string());
    lines.push(format!("  {:<52} {:>10} {:>8}", "Stack (hottest first)", "SAMPLES", "%"));
    lines.push(format!("  {}", "-".repeat(72)));

    let total = total_hits.max(1);

    for stack in stacks.iter().take(max_lines) {
        let percentage = (stack.weight as f64 / total as f64) * 100.0;

        let display_stack = if stack.stack.chars().count() > 50 {
            let tail: String = {
                let chars: Vec<char> = stack.stack.chars().collect();
                chars[chars.len() - 47..].iter().collect()
            };
            format!("...{}", tail)
        } else {
            stack.stack.clone()
        };

        lines.push(format!("  {:<52} {:>10} {:>7.1}%", display_stack, stack.weight, percentage));
    }

    if stacks.len() > max_lines {
        lines.push(String::new());
        lines.push(format!("   (Showing top {} of {} unique stacks)", max_lines, stacks.len()));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacks() -> Vec<CollapsedStack> {
        vec![
            CollapsedStack::new("main;f;g".to_string(), 6),
            CollapsedStack::new("main;f".to_string(), 3),
            CollapsedStack::new("main;<anon>".to_string(), 1),
        ]
    }

    #[test]
    fn test_empty_stacks_rejected() {
        assert!(matches!(
            generate_flamegraph(&[], None),
            Err(FlamegraphError::EmptyStacks)
        ));
        let zero = vec![CollapsedStack::new("main".to_string(), 0)];
        assert!(generate_flamegraph(&zero, None).is_err());
    }

    #[test]
    fn test_generate_flamegraph() {
        let config = FlamegraphConfig::new().with_title("Test & Profile").with_width(800);
        let svg = generate_flamegraph(&stacks(), Some(&config)).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Test &amp; Profile"));
        assert!(svg.contains("&lt;anon&gt;"));
        assert!(svg.contains("main (10 samples, 100.00%)"));
    }

    #[test]
    fn test_sibling_order_is_stable() {
        let stacks = vec![
            CollapsedStack::new("main;zeta".to_string(), 2),
            CollapsedStack::new("main;alpha".to_string(), 2),
            CollapsedStack::new("main;mid".to_string(), 2),
        ];
        let first = generate_flamegraph(&stacks, None).unwrap();
        let second = generate_flamegraph(&stacks, None).unwrap();
        assert_eq!(first, second);

        let alpha = first.find("<title>alpha").unwrap();
        let mid = first.find("<title>mid").unwrap();
        let zeta = first.find("<title>zeta").unwrap();
        assert!(alpha < mid && mid < zeta);
    }

    #[test]
    fn test_node_color_is_stable() {
        assert_eq!(get_node_color("main"), get_node_color("main"));
    }

    #[test]
    fn test_text_summary() {
        let summary = generate_text_summary(&stacks(), 2, 10);
        assert!(summary.contains("main;f;g"));
        assert!(summary.contains("60.0%"));
        assert!(summary.contains("Showing top 2 of 3"));
    }
}
