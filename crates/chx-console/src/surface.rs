//! Display surface abstraction.
//!
//! The console never touches a concrete UI tree. It renders through
//! [`DisplaySurface`], which exposes node management, scroll geometry, and an
//! opaque markup serialization of the rendered content. [`TextSurface`] is
//! the shipped headless implementation; real UI layers adapt their own
//! widget tree behind the same trait.

use crate::line::{Entrance, RenderedNode};

/// Separates serialized nodes in [`TextSurface`] markup.
const RECORD_SEPARATOR: char = '\u{1e}';
/// Separates the style class from the text within one serialized node.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Viewport scroll geometry, in surface-defined units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    /// Current scroll position.
    pub offset: usize,
    /// Largest reachable scroll position (0 when content fits the viewport).
    pub max_offset: usize,
}

impl ScrollMetrics {
    /// True if the content extends beyond the viewport.
    pub fn has_overflow(self) -> bool {
        self.max_offset > 0
    }
}

/// How a programmatic scroll should move the viewport.
///
/// Surfaces without animation are free to treat both variants as a jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    /// Jump directly to the target position.
    Instant,
    /// Animate toward the target position.
    Smooth,
}

/// A bounded display the console renders onto.
///
/// The console is the only writer while it holds the surface; hosts read
/// nodes for presentation and feed user scroll positions back through
/// [`DisplaySurface::scroll_to`].
pub trait DisplaySurface {
    /// Rendered nodes, oldest first.
    fn nodes(&self) -> &[RenderedNode];

    /// Appends nodes at the bottom, preserving order.
    fn append_nodes(&mut self, nodes: Vec<RenderedNode>);

    /// Replaces the entire rendered content.
    fn replace_nodes(&mut self, nodes: Vec<RenderedNode>);

    /// Removes up to `count` of the oldest non-progress-indicator nodes, in
    /// insertion order. Returns how many were removed.
    fn remove_oldest_regular_nodes(&mut self, count: usize) -> usize;

    /// Removes all nodes.
    fn clear(&mut self);

    /// Current scroll geometry.
    fn scroll_metrics(&self) -> ScrollMetrics;

    /// Moves the viewport to `offset` (clamped by the surface).
    fn scroll_to(&mut self, offset: usize, behavior: ScrollBehavior);

    /// Serializes the rendered content to an opaque markup string.
    ///
    /// The console persists this value verbatim; only the surface that
    /// produced it needs to understand the format.
    fn export_markup(&self) -> String;

    /// Replaces the rendered content from a markup string previously
    /// produced by [`DisplaySurface::export_markup`].
    fn import_markup(&mut self, markup: &str);

    /// Full rendered text, line terminators included.
    fn text_content(&self) -> String {
        self.nodes().iter().map(|n| n.text.as_str()).collect()
    }
}

/// In-memory display surface with row-based scroll geometry.
///
/// Behaves like a scroll container: growing content leaves the offset where
/// it was (so a viewport that was at the bottom is no longer), shrinking
/// content clamps it.
#[derive(Debug, Clone)]
pub struct TextSurface {
    nodes: Vec<RenderedNode>,
    viewport_rows: usize,
    offset: usize,
}

impl TextSurface {
    /// Creates an empty surface with the given viewport height in rows.
    pub fn new(viewport_rows: usize) -> Self {
        Self {
            nodes: Vec::new(),
            viewport_rows,
            offset: 0,
        }
    }

    /// Total content height in rows.
    fn content_rows(&self) -> usize {
        self.nodes.iter().map(node_rows).sum()
    }

    fn max_offset(&self) -> usize {
        self.content_rows().saturating_sub(self.viewport_rows)
    }
}

/// Rows occupied by one node (at least one; embedded newlines add rows).
fn node_rows(node: &RenderedNode) -> usize {
    node.text.bytes().filter(|b| *b == b'\n').count().max(1)
}

impl DisplaySurface for TextSurface {
    fn nodes(&self) -> &[RenderedNode] {
        &self.nodes
    }

    fn append_nodes(&mut self, nodes: Vec<RenderedNode>) {
        self.nodes.extend(nodes);
    }

    fn replace_nodes(&mut self, nodes: Vec<RenderedNode>) {
        self.nodes = nodes;
    }

    fn remove_oldest_regular_nodes(&mut self, count: usize) -> usize {
        let mut remaining = count;
        self.nodes.retain(|node| {
            if remaining > 0 && !node.is_progress_indicator() {
                remaining -= 1;
                false
            } else {
                true
            }
        });
        count - remaining
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.offset = 0;
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        let max_offset = self.max_offset();
        ScrollMetrics {
            offset: self.offset.min(max_offset),
            max_offset,
        }
    }

    fn scroll_to(&mut self, offset: usize, _behavior: ScrollBehavior) {
        self.offset = offset.min(self.max_offset());
    }

    fn export_markup(&self) -> String {
        let mut out = String::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                out.push(RECORD_SEPARATOR);
            }
            if let Some(class) = &node.style_class {
                out.push_str(class);
            }
            out.push(FIELD_SEPARATOR);
            out.push_str(&node.text);
        }
        out
    }

    fn import_markup(&mut self, markup: &str) {
        self.nodes.clear();
        if markup.is_empty() {
            return;
        }
        for record in markup.split(RECORD_SEPARATOR) {
            let (class, text) = record.split_once(FIELD_SEPARATOR).unwrap_or(("", record));
            if text.is_empty() {
                continue;
            }
            self.nodes.push(RenderedNode {
                text: text.to_owned(),
                style_class: (!class.is_empty()).then(|| class.to_owned()),
                entrance: Entrance::Immediate,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{LogLine, PROGRESS_STYLE_CLASS};

    fn node(text: &str, class: Option<&str>) -> RenderedNode {
        RenderedNode::from_line(&LogLine::new(text, class), 0)
    }

    #[test]
    fn test_growth_does_not_follow_bottom() {
        let mut surface = TextSurface::new(2);
        surface.append_nodes(vec![node("a", None), node("b", None)]);
        let metrics = surface.scroll_metrics();
        assert_eq!(metrics.max_offset, 0);
        assert!(!metrics.has_overflow());

        surface.append_nodes(vec![node("c", None), node("d", None)]);
        let metrics = surface.scroll_metrics();
        // Content grew but the viewport stayed where it was.
        assert_eq!(metrics.offset, 0);
        assert_eq!(metrics.max_offset, 2);
    }

    #[test]
    fn test_scroll_to_clamps() {
        let mut surface = TextSurface::new(2);
        surface.append_nodes((0..5).map(|i| node(&format!("l{i}"), None)).collect());
        surface.scroll_to(999, ScrollBehavior::Instant);
        assert_eq!(surface.scroll_metrics().offset, 3);
    }

    #[test]
    fn test_shrink_clamps_offset() {
        let mut surface = TextSurface::new(2);
        surface.append_nodes((0..6).map(|i| node(&format!("l{i}"), None)).collect());
        surface.scroll_to(4, ScrollBehavior::Instant);

        surface.remove_oldest_regular_nodes(4);
        assert_eq!(surface.scroll_metrics().offset, 0);
        assert_eq!(surface.nodes().len(), 2);
    }

    #[test]
    fn test_remove_oldest_skips_progress_nodes() {
        let mut surface = TextSurface::new(10);
        surface.append_nodes(vec![
            node("working", Some(PROGRESS_STYLE_CLASS)),
            node("one", None),
            node("two", None),
            node("three", None),
        ]);
        let removed = surface.remove_oldest_regular_nodes(2);
        assert_eq!(removed, 2);
        let texts: Vec<&str> = surface.nodes().iter().map(RenderedNode::line_text).collect();
        assert_eq!(texts, vec!["working", "three"]);
    }

    #[test]
    fn test_remove_more_than_available() {
        let mut surface = TextSurface::new(10);
        surface.append_nodes(vec![node("only", None)]);
        assert_eq!(surface.remove_oldest_regular_nodes(5), 1);
        assert!(surface.nodes().is_empty());
    }

    #[test]
    fn test_markup_round_trip() {
        let mut surface = TextSurface::new(10);
        surface.append_nodes(vec![
            node("plain", None),
            node("warning text", Some("warn")),
            node("working", Some(PROGRESS_STYLE_CLASS)),
        ]);

        let markup = surface.export_markup();
        let mut restored = TextSurface::new(10);
        restored.import_markup(&markup);

        assert_eq!(restored.nodes().len(), 3);
        for (a, b) in surface.nodes().iter().zip(restored.nodes()) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.style_class, b.style_class);
        }
        // Restored nodes come back without entrance animation.
        assert!(
            restored
                .nodes()
                .iter()
                .all(|n| n.entrance == Entrance::Immediate)
        );
    }

    #[test]
    fn test_import_empty_markup_clears() {
        let mut surface = TextSurface::new(10);
        surface.append_nodes(vec![node("stale", None)]);
        surface.import_markup("");
        assert!(surface.nodes().is_empty());
    }

    #[test]
    fn test_text_content_joins_lines() {
        let mut surface = TextSurface::new(10);
        surface.append_nodes(vec![node("a", None), node("b", None)]);
        assert_eq!(surface.text_content(), "a\nb\n");
    }
}
