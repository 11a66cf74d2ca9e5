//! Scroll anchoring.
//!
//! Tracks whether the viewport should follow new output. The console stays
//! pinned to the bottom until the user scrolls away; once they do, automatic
//! scrolling is suspended until they return to the bottom (or an explicit
//! jump clears the latch).

use crate::surface::ScrollMetrics;

/// Pinned-to-bottom tracking for a console viewport.
#[derive(Debug, Clone)]
pub struct ScrollState {
    /// Scroll-unit tolerance for "close enough to the bottom".
    threshold: usize,
    /// Latched when the user scrolled away from the bottom.
    user_scrolled_up: bool,
}

impl ScrollState {
    /// Creates a new state with the given bottom tolerance.
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            user_scrolled_up: false,
        }
    }

    /// True if the given viewport position counts as pinned to bottom.
    pub fn is_at_bottom(&self, metrics: ScrollMetrics) -> bool {
        metrics.offset.abs_diff(metrics.max_offset) <= self.threshold
    }

    /// True while automatic scrolling is suspended.
    pub fn user_scrolled_up(&self) -> bool {
        self.user_scrolled_up
    }

    /// Re-evaluates the latch after a user scroll has settled.
    ///
    /// Scrolling away from the bottom sets it; returning to within the
    /// threshold clears it.
    pub fn settle(&mut self, metrics: ScrollMetrics) {
        self.user_scrolled_up = !self.is_at_bottom(metrics);
    }

    /// Clears the latch (explicit jump to bottom).
    pub fn reset(&mut self) {
        self.user_scrolled_up = false;
    }
}
