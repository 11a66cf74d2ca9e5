//! Log line data model.
//!
//! A [`LogLine`] is a pending entry in the console's buffer; a
//! [`RenderedNode`] is its materialized form on the display surface,
//! carrying the trailing line terminator and an entrance animation tag.

use std::time::Duration;

/// Style class that marks a line as an ephemeral status indicator.
///
/// Progress-indicator nodes are never counted toward the retained-line cap
/// and are never evicted; they represent transient state (a spinner line,
/// "working..." markers), not log history.
pub const PROGRESS_STYLE_CLASS: &str = "progress-indicator";

/// Per-index entrance delay for lines within one flushed batch, so later
/// lines in the same batch fade in slightly after earlier ones.
pub(crate) const BATCH_FADE_STRIDE: Duration = Duration::from_millis(20);

/// A pending log line, produced by `append`/`append_batch` and consumed by
/// the next flush cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Raw line text, without a trailing terminator.
    pub text: String,
    /// Optional style class forwarded to the rendered node.
    pub style_class: Option<String>,
}

impl LogLine {
    /// Creates a pending line.
    pub fn new(text: impl Into<String>, style_class: Option<&str>) -> Self {
        Self {
            text: text.into(),
            style_class: style_class.map(str::to_owned),
        }
    }
}

/// Entrance animation applied to a node when it lands on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entrance {
    /// Shown as soon as it is appended, with no animation.
    Immediate,
    /// Fades in after the given delay.
    FadeIn {
        /// Delay before the fade starts.
        delay: Duration,
    },
}

/// A line materialized onto the display surface.
///
/// Owned exclusively by the surface; its lifetime ends when it is evicted
/// or the surface is cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNode {
    /// Line text including the trailing terminator.
    pub text: String,
    /// Optional style class.
    pub style_class: Option<String>,
    /// Entrance animation tag.
    pub entrance: Entrance,
}

impl RenderedNode {
    /// Materializes a pending line at the given position within its batch.
    ///
    /// Progress-style lines (by class or by text marker) appear immediately;
    /// everything else fades in with a per-index delay.
    pub fn from_line(line: &LogLine, index: usize) -> Self {
        let progress = line.style_class.as_deref() == Some(PROGRESS_STYLE_CLASS)
            || has_progress_marker(&line.text);
        let entrance = if progress {
            Entrance::Immediate
        } else {
            Entrance::FadeIn {
                delay: BATCH_FADE_STRIDE * index as u32,
            }
        };
        Self {
            text: format!("{}\n", line.text),
            style_class: line.style_class.clone(),
            entrance,
        }
    }

    /// True if this node is exempt from eviction.
    ///
    /// Only the explicit style class counts here; text markers affect the
    /// entrance animation but not eviction.
    pub fn is_progress_indicator(&self) -> bool {
        self.style_class.as_deref() == Some(PROGRESS_STYLE_CLASS)
    }

    /// Node text without the trailing terminator.
    pub fn line_text(&self) -> &str {
        self.text.strip_suffix('\n').unwrap_or(&self.text)
    }
}

/// True if the text reads as a progress-style status line.
fn has_progress_marker(text: &str) -> bool {
    text.contains("...") || text.contains('⏳')
}
