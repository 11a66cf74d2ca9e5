//! Console configuration.
//!
//! All tuning is fixed at construction time; the console never re-reads its
//! configuration while running.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Construction-time tuning for a console instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Key of the persisted slot in the durable store.
    pub storage_key: String,
    /// Cap on retained regular (non-progress) lines on the surface.
    pub max_lines: usize,
    /// Maximum pending lines materialized per flush cycle.
    pub batch_size: usize,
    /// Scroll-unit tolerance for treating the viewport as pinned to bottom.
    pub scroll_threshold: usize,
    /// Quiet period after the last flush before rendered content is saved.
    pub save_debounce_ms: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            storage_key: "chx_console_logs".to_string(),
            max_lines: 250,
            batch_size: 50,
            scroll_threshold: 10,
            save_debounce_ms: 500,
        }
    }
}

impl ConsoleConfig {
    /// Save debounce as a [`Duration`].
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}
